// SPDX-License-Identifier: MIT

//! The Code Validator (spec.md §4.5): a single-pass static gate over the
//! trait-script AST. Checks run in the order the spec lists them so the
//! first violation found is the one reported, matching the "rejections are
//! typed by reason code" contract Gatekeeper and the mutation record both
//! rely on.

use std::collections::HashSet;

use mp_core::ReasonCode;
use sha2::{Digest, Sha256};

use super::ast::{ClassDef, Expr, Module, Stmt};
use super::error::ScriptError;
use super::parser::parse;

/// Modules a trait script may `import` (spec.md §4.5 step 2). `__future__`
/// is accepted for parity with the original `from __future__ import
/// annotations` idiom even though this grammar has no type annotations to
/// defer.
const IMPORT_WHITELIST: &[&str] = &[
    "math",
    "random",
    "typing",
    "dataclasses",
    "enum",
    "collections",
    "functools",
    "itertools",
    "__future__",
];

/// Every module name the validator recognizes as "known" for step 5's
/// undefined-module-reference check. Using one of these as an attribute
/// base without importing it first is rejected even though `math` and
/// `random` are also dispatch namespaces the interpreter understands
/// natively.
const KNOWN_MODULES: &[&str] = IMPORT_WHITELIST;

const BANNED_CALLS: &[&str] = &[
    "eval", "exec", "compile", "open", "__import__", "breakpoint", "globals", "locals", "vars",
    "dir", "help", "input", "print",
];

const BANNED_ATTRS: &[&str] = &[
    "__subclasses__",
    "__bases__",
    "__globals__",
    "__code__",
    "__builtins__",
    "__dict__",
    "__class__",
    "__mro__",
];

const ENTITY_FIELDS: &[&str] =
    &["id", "x", "y", "energy", "max_energy", "age", "max_age", "metabolism_rate", "traits", "state", "entity_type"];

const ENTITY_METHODS: &[&str] =
    &["move", "eat_nearby", "attack_nearby", "is_alive", "deactivate_trait", "activate_trait"];

const TRAIT_BASES: &[&str] = &["BaseTrait", "Trait"];

/// A rejection from any validator step, carrying the typed reason code
/// spec.md §4.5/§7 asks every failure path to surface. Converts into the
/// crate-wide [`ScriptError`] at the `validate` boundary so callers only
/// need to handle one error type.
#[derive(Debug, Clone, PartialEq)]
struct Rejection {
    reason: ReasonCode,
    detail: String,
}

impl Rejection {
    fn new(reason: ReasonCode, detail: impl Into<String>) -> Self {
        Self { reason, detail: detail.into() }
    }
}

impl From<Rejection> for ScriptError {
    fn from(r: Rejection) -> Self {
        ScriptError::Rejected { reason: r.reason, detail: r.detail }
    }
}

/// A trait module that passed every validator check.
#[derive(Debug, Clone)]
pub struct ValidatedTrait {
    pub module: Module,
    /// The raw class name as written in source (e.g. `ResourceDiversifierTrait`).
    pub class_name: String,
    /// `canonical(class_name)`, the registry key.
    pub canonical_name: String,
    pub source_hash: String,
}

/// Run the full validator pipeline over `source`. `is_hash_used` backs step
/// 11's deduplication check (spec.md §4.5): it should consult the
/// persistent hash-used set (`mp-storage`'s `MutationStore`), not mutate
/// it — the Patcher marks a hash used only after a successful load so a
/// failed validation never poisons the set.
pub fn validate(source: &str, is_hash_used: impl Fn(&str) -> bool) -> Result<ValidatedTrait, ScriptError> {
    validate_inner(source, is_hash_used).map_err(ScriptError::from)
}

fn validate_inner(source: &str, is_hash_used: impl Fn(&str) -> bool) -> Result<ValidatedTrait, Rejection> {
    let module = parse(source).map_err(|e| Rejection::new(ReasonCode::SyntaxError, e.to_string()))?;

    check_imports(&module)?;
    check_banned_calls(&module)?;
    check_banned_attrs(&module)?;
    check_undefined_modules(&module)?;

    let trait_class = find_trait_class(&module)
        .ok_or_else(|| Rejection::new(ReasonCode::AstNoTraitClass, "no class inherits BaseTrait/Trait with an async execute(self, entity) method"))?;

    check_unbound_variables(&module, trait_class)?;
    check_entity_attrs(&module)?;
    check_constructor(trait_class)?;
    check_await_on_sync(&module)?;

    let source_hash = content_hash(source);
    if is_hash_used(&source_hash) {
        return Err(Rejection::new(ReasonCode::DuplicateCode, "identical source already in use"));
    }

    let canonical_name = mp_core::canonical(&trait_class.name);
    Ok(ValidatedTrait { module, class_name: trait_class.name.clone(), canonical_name, source_hash })
}

pub fn content_hash(source: &str) -> String {
    let digest = Sha256::digest(source.as_bytes());
    hex::encode(digest)
}

/// Tiny hex encoder so the crate doesn't need a `hex` dependency just for
/// this one call site.
mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        let mut s = String::with_capacity(bytes.as_ref().len() * 2);
        for b in bytes.as_ref() {
            s.push_str(&format!("{b:02x}"));
        }
        s
    }
}

fn check_imports(module: &Module) -> Result<(), Rejection> {
    for import in &module.imports {
        if !IMPORT_WHITELIST.contains(&import.module.as_str()) {
            return Err(Rejection::new(
                ReasonCode::AstImportForbidden,
                format!("import of '{}' is not in the whitelist", import.module),
            ));
        }
    }
    Ok(())
}

fn walk_classes<'a>(module: &'a Module, mut visit: impl FnMut(&'a Expr) -> Result<(), Rejection>) -> Result<(), Rejection> {
    for class in &module.classes {
        for method in &class.methods {
            walk_stmts(&method.body, &mut visit)?;
        }
    }
    Ok(())
}

fn walk_stmts<'a>(stmts: &'a [Stmt], visit: &mut impl FnMut(&'a Expr) -> Result<(), Rejection>) -> Result<(), Rejection> {
    for stmt in stmts {
        match stmt {
            Stmt::Assign { value, .. } => visit(value)?,
            Stmt::AugAssign { value, .. } => visit(value)?,
            Stmt::ExprStmt(e) => visit(e)?,
            Stmt::If { cond, then_body, elifs, else_body } => {
                visit(cond)?;
                walk_stmts(then_body, visit)?;
                for (c, b) in elifs {
                    visit(c)?;
                    walk_stmts(b, visit)?;
                }
                walk_stmts(else_body, visit)?;
            }
            Stmt::ForRange { count, body, .. } => {
                visit(count)?;
                walk_stmts(body, visit)?;
            }
            Stmt::Try { body, except_body } => {
                walk_stmts(body, visit)?;
                walk_stmts(except_body, visit)?;
            }
            Stmt::Return(Some(e)) => visit(e)?,
            Stmt::Return(None) | Stmt::Pass => {}
        }
    }
    Ok(())
}

/// Recurse into every subexpression of `expr`, calling `visit` on `expr`
/// itself first (pre-order), so callers can pattern-match the outermost
/// node (a `Call`, an `Attribute`) before descending into its operands.
fn walk_expr<'a>(expr: &'a Expr, visit: &mut impl FnMut(&'a Expr) -> Result<(), Rejection>) -> Result<(), Rejection> {
    visit(expr)?;
    match expr {
        Expr::Attribute { base, .. } => walk_expr(base, visit),
        Expr::Call { func, args } => {
            walk_expr(func, visit)?;
            for a in args {
                walk_expr(a, visit)?;
            }
            Ok(())
        }
        Expr::Await(inner) | Expr::UnaryNeg(inner) | Expr::UnaryNot(inner) => walk_expr(inner, visit),
        Expr::BinOp { lhs, rhs, .. } | Expr::BoolOp { lhs, rhs, .. } | Expr::Compare { lhs, rhs, .. } => {
            walk_expr(lhs, visit)?;
            walk_expr(rhs, visit)
        }
        Expr::IntLit(_) | Expr::FloatLit(_) | Expr::StrLit(_) | Expr::BoolLit(_) | Expr::NoneLit | Expr::Name(_) => {
            Ok(())
        }
    }
}

fn check_banned_calls(module: &Module) -> Result<(), Rejection> {
    walk_classes(module, |expr| {
        walk_expr(expr, &mut |e| {
            if let Expr::Call { func, .. } = e {
                if let Expr::Name(name) = func.as_ref() {
                    if BANNED_CALLS.contains(&name.as_str()) {
                        return Err(Rejection::new(ReasonCode::AstBannedCall, format!("call to banned builtin '{name}'")));
                    }
                }
            }
            Ok(())
        })
    })
}

fn check_banned_attrs(module: &Module) -> Result<(), Rejection> {
    walk_classes(module, |expr| {
        walk_expr(expr, &mut |e| {
            if let Expr::Attribute { attr, .. } = e {
                if BANNED_ATTRS.contains(&attr.as_str()) {
                    return Err(Rejection::new(ReasonCode::AstBannedAttr, format!("access to banned attribute '{attr}'")));
                }
            }
            Ok(())
        })
    })
}

fn check_undefined_modules(module: &Module) -> Result<(), Rejection> {
    let imported: HashSet<&str> = module.imports.iter().map(|i| i.module.as_str()).collect();
    walk_classes(module, |expr| {
        walk_expr(expr, &mut |e| {
            if let Expr::Attribute { base, .. } = e {
                if let Expr::Name(name) = base.as_ref() {
                    if KNOWN_MODULES.contains(&name.as_str())
                        && name != "math"
                        && name != "random"
                        && !imported.contains(name.as_str())
                    {
                        return Err(Rejection::new(
                            ReasonCode::AstUnboundVariable,
                            format!("'{name}' used without a matching import"),
                        ));
                    }
                }
            }
            Ok(())
        })
    })
}

fn find_trait_class(module: &Module) -> Option<&ClassDef> {
    module.classes.iter().find(|c| {
        c.bases.iter().any(|b| TRAIT_BASES.contains(&b.as_str()))
            && c.methods.iter().any(|m| m.name == "execute" && m.is_async && m.params.len() >= 2)
    })
}

fn check_entity_attrs(module: &Module) -> Result<(), Rejection> {
    walk_classes(module, |expr| {
        walk_expr(expr, &mut |e| match e {
            Expr::Call { func, .. } => {
                if let Expr::Attribute { base, attr } = func.as_ref() {
                    if is_entity(base) && !ENTITY_METHODS.contains(&attr.as_str()) {
                        return Err(Rejection::new(
                            ReasonCode::AstEntityAttrForbidden,
                            format!("entity.{attr} is not a whitelisted method"),
                        ));
                    }
                }
                Ok(())
            }
            Expr::Attribute { base, attr } => {
                if is_entity(base) && !ENTITY_FIELDS.contains(&attr.as_str()) && !ENTITY_METHODS.contains(&attr.as_str()) {
                    return Err(Rejection::new(
                        ReasonCode::AstEntityAttrForbidden,
                        format!("entity.{attr} is not a whitelisted field"),
                    ));
                }
                Ok(())
            }
            _ => Ok(()),
        })
    })
}

fn is_entity(expr: &Expr) -> bool {
    matches!(expr, Expr::Name(n) if n == "entity")
}

fn check_constructor(class: &ClassDef) -> Result<(), Rejection> {
    if let Some(init) = class.methods.iter().find(|m| m.name == "__init__") {
        if init.params.len() > 1 {
            return Err(Rejection::new(
                ReasonCode::AstInitRequiredArgs,
                "trait __init__ must take no parameters beyond self",
            ));
        }
    }
    Ok(())
}

fn check_await_on_sync(module: &Module) -> Result<(), Rejection> {
    walk_classes(module, |expr| {
        walk_expr(expr, &mut |e| {
            if let Expr::Await(inner) = e {
                if let Expr::Call { func, .. } = inner.as_ref() {
                    if let Expr::Attribute { base, .. } = func.as_ref() {
                        if is_entity(base) {
                            return Err(Rejection::new(
                                ReasonCode::AstAwaitOnSync,
                                "entity methods are synchronous; do not await them",
                            ));
                        }
                    }
                }
            }
            Ok(())
        })
    })
}

/// Unbound-variable analysis over a trait's `execute` method (spec.md §4.5
/// step 6): a conservative definite/maybe-assigned tracker. Names assigned
/// in every branch of an `if`/`elif`/.../`else` (with an `else` present)
/// become definite after the statement; names assigned in only some
/// branches, in a `for`, or in a `try` body become "maybe assigned" and a
/// later unconditional load of one is rejected (this is the
/// `UnboundLocalError` class of bug the spec calls out).
fn check_unbound_variables(module: &Module, class: &ClassDef) -> Result<(), Rejection> {
    let Some(execute) = class.methods.iter().find(|m| m.name == "execute") else {
        return Ok(());
    };
    let mut definite: HashSet<String> = execute.params.iter().cloned().collect();
    definite.extend(module.imports.iter().map(|i| i.module.clone()));
    let mut maybe: HashSet<String> = HashSet::new();
    check_block(&execute.body, &mut definite, &mut maybe)
}

fn check_block(stmts: &[Stmt], definite: &mut HashSet<String>, maybe: &mut HashSet<String>) -> Result<(), Rejection> {
    for stmt in stmts {
        match stmt {
            Stmt::Assign { target, value } => {
                check_expr(value, definite, maybe)?;
                definite.insert(target.clone());
                maybe.remove(target);
            }
            Stmt::AugAssign { target, value, .. } => {
                if !definite.contains(target) {
                    return Err(unbound(target));
                }
                check_expr(value, definite, maybe)?;
            }
            Stmt::ExprStmt(e) => check_expr(e, definite, maybe)?,
            Stmt::If { cond, then_body, elifs, else_body } => {
                check_expr(cond, definite, maybe)?;

                let mut branch_assigned = Vec::new();

                let mut then_def = definite.clone();
                let mut then_maybe = maybe.clone();
                check_block(then_body, &mut then_def, &mut then_maybe)?;
                branch_assigned.push(then_def.clone());

                for (c, body) in elifs {
                    check_expr(c, definite, maybe)?;
                    let mut d = definite.clone();
                    let mut m = maybe.clone();
                    check_block(body, &mut d, &mut m)?;
                    branch_assigned.push(d);
                }

                let has_else = !else_body.is_empty();
                if has_else {
                    let mut d = definite.clone();
                    let mut m = maybe.clone();
                    check_block(else_body, &mut d, &mut m)?;
                    branch_assigned.push(d);
                }

                if has_else {
                    let mut common = branch_assigned[0].clone();
                    for bd in &branch_assigned[1..] {
                        common = common.intersection(bd).cloned().collect();
                    }
                    for name in common {
                        definite.insert(name);
                    }
                }
                for bd in &branch_assigned {
                    for name in bd {
                        if !definite.contains(name) {
                            maybe.insert(name.clone());
                        }
                    }
                }
            }
            Stmt::ForRange { var, count, body } => {
                check_expr(count, definite, maybe)?;
                let mut d = definite.clone();
                d.insert(var.clone());
                let mut m = maybe.clone();
                check_block(body, &mut d, &mut m)?;
                for name in &d {
                    if !definite.contains(name) {
                        maybe.insert(name.clone());
                    }
                }
            }
            Stmt::Try { body, except_body } => {
                let mut d = definite.clone();
                let mut m = maybe.clone();
                check_block(body, &mut d, &mut m)?;
                for name in &d {
                    if !definite.contains(name) {
                        maybe.insert(name.clone());
                    }
                }
                let mut d2 = definite.clone();
                let mut m2 = maybe.clone();
                check_block(except_body, &mut d2, &mut m2)?;
                for name in &d2 {
                    if !definite.contains(name) {
                        maybe.insert(name.clone());
                    }
                }
            }
            Stmt::Return(Some(e)) => check_expr(e, definite, maybe)?,
            Stmt::Return(None) | Stmt::Pass => {}
        }
    }
    Ok(())
}

fn check_expr(expr: &Expr, definite: &HashSet<String>, maybe: &HashSet<String>) -> Result<(), Rejection> {
    match expr {
        Expr::Name(n) => {
            if n == "entity" || n == "self" || n == "math" || n == "random" {
                return Ok(());
            }
            if definite.contains(n) {
                return Ok(());
            }
            if maybe.contains(n) {
                return Err(unbound_potential(n));
            }
            Err(unbound(n))
        }
        Expr::Attribute { base, .. } => check_expr(base, definite, maybe),
        Expr::Call { func, args } => {
            check_expr(func, definite, maybe)?;
            for a in args {
                check_expr(a, definite, maybe)?;
            }
            Ok(())
        }
        Expr::Await(inner) | Expr::UnaryNeg(inner) | Expr::UnaryNot(inner) => check_expr(inner, definite, maybe),
        Expr::BinOp { lhs, rhs, .. } | Expr::BoolOp { lhs, rhs, .. } | Expr::Compare { lhs, rhs, .. } => {
            check_expr(lhs, definite, maybe)?;
            check_expr(rhs, definite, maybe)
        }
        Expr::IntLit(_) | Expr::FloatLit(_) | Expr::StrLit(_) | Expr::BoolLit(_) | Expr::NoneLit => Ok(()),
    }
}

fn unbound(name: &str) -> Rejection {
    Rejection::new(ReasonCode::AstUnboundVariable, format!("'{name}' is never assigned"))
}

fn unbound_potential(name: &str) -> Rejection {
    Rejection::new(
        ReasonCode::AstUnboundVariable,
        format!("'{name}' is only assigned conditionally before this unconditional use"),
    )
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
