// SPDX-License-Identifier: MIT

use super::*;
use mp_core::ReasonCode;

fn never_used(_: &str) -> bool {
    false
}

fn reason_of(err: ScriptError) -> ReasonCode {
    match err {
        ScriptError::Rejected { reason, .. } => reason,
        other => panic!("expected a Rejected error, got {other:?}"),
    }
}

const VALID_TRAIT: &str = "\
import math

class Forager(BaseTrait):
    async def execute(self, entity):
        gained = entity.eat_nearby(10)
        if gained > 0:
            entity.move(1, 0)
        else:
            entity.move(0, 1)
";

#[test]
fn accepts_a_well_formed_trait() {
    let validated = validate(VALID_TRAIT, never_used).expect("should validate");
    assert_eq!(validated.class_name, "Forager");
    assert_eq!(validated.canonical_name, mp_core::canonical("Forager"));
    assert_eq!(validated.source_hash.len(), 64);
}

#[test]
fn rejects_syntax_errors() {
    let src = "class T(BaseTrait):\n    async def execute(self, entity):\n        while True:\n            pass\n";
    let err = validate(src, never_used).unwrap_err();
    assert_eq!(reason_of(err), ReasonCode::SyntaxError);
}

#[test]
fn rejects_imports_outside_the_whitelist() {
    let src = "\
import os

class T(BaseTrait):
    async def execute(self, entity):
        pass
";
    let err = validate(src, never_used).unwrap_err();
    assert_eq!(reason_of(err), ReasonCode::AstImportForbidden);
}

#[test]
fn rejects_banned_builtin_calls() {
    let src = "\
class T(BaseTrait):
    async def execute(self, entity):
        eval(\"1\")
";
    let err = validate(src, never_used).unwrap_err();
    assert_eq!(reason_of(err), ReasonCode::AstBannedCall);
}

#[test]
fn rejects_banned_dunder_attrs() {
    let src = "\
class T(BaseTrait):
    async def execute(self, entity):
        x = entity.__class__
";
    let err = validate(src, never_used).unwrap_err();
    assert_eq!(reason_of(err), ReasonCode::AstBannedAttr);
}

#[test]
fn rejects_modules_referenced_without_import() {
    let src = "\
class T(BaseTrait):
    async def execute(self, entity):
        x = typing.List
";
    let err = validate(src, never_used).unwrap_err();
    assert_eq!(reason_of(err), ReasonCode::AstUnboundVariable);
}

#[test]
fn rejects_classes_with_no_trait_base() {
    let src = "\
class Plain:
    async def execute(self, entity):
        pass
";
    let err = validate(src, never_used).unwrap_err();
    assert_eq!(reason_of(err), ReasonCode::AstNoTraitClass);
}

#[test]
fn rejects_unbound_variable_reads() {
    let src = "\
class T(BaseTrait):
    async def execute(self, entity):
        entity.move(boost, 0)
";
    let err = validate(src, never_used).unwrap_err();
    assert_eq!(reason_of(err), ReasonCode::AstUnboundVariable);
}

#[test]
fn accepts_a_bare_reference_to_an_imported_whitelisted_module() {
    let src = "\
import collections

class T(BaseTrait):
    async def execute(self, entity):
        counts = collections.Counter()
        entity.move(1, 0)
";
    validate(src, never_used).expect("collections should be bound after import, not just permitted as an attribute base");
}

#[test]
fn rejects_conditionally_assigned_variable_used_unconditionally() {
    let src = "\
class T(BaseTrait):
    async def execute(self, entity):
        if entity.energy > 5:
            boost = 1
        entity.move(boost, 0)
";
    let err = validate(src, never_used).unwrap_err();
    assert_eq!(reason_of(err), ReasonCode::AstUnboundVariable);
}

#[test]
fn accepts_variable_assigned_in_every_branch_including_else() {
    let src = "\
class T(BaseTrait):
    async def execute(self, entity):
        if entity.energy > 5:
            boost = 1
        else:
            boost = 0
        entity.move(boost, 0)
";
    validate(src, never_used).expect("should validate: boost is definite after the if/else");
}

#[test]
fn rejects_entity_attributes_outside_the_whitelist() {
    let src = "\
class T(BaseTrait):
    async def execute(self, entity):
        x = entity.secret_field
";
    let err = validate(src, never_used).unwrap_err();
    assert_eq!(reason_of(err), ReasonCode::AstEntityAttrForbidden);
}

#[test]
fn rejects_entity_methods_outside_the_whitelist() {
    let src = "\
class T(BaseTrait):
    async def execute(self, entity):
        entity.delete_world()
";
    let err = validate(src, never_used).unwrap_err();
    assert_eq!(reason_of(err), ReasonCode::AstEntityAttrForbidden);
}

#[test]
fn rejects_init_with_required_arguments() {
    let src = "\
class T(BaseTrait):
    def __init__(self, boost):
        pass

    async def execute(self, entity):
        pass
";
    let err = validate(src, never_used).unwrap_err();
    assert_eq!(reason_of(err), ReasonCode::AstInitRequiredArgs);
}

#[test]
fn rejects_awaiting_a_synchronous_entity_method() {
    let src = "\
class T(BaseTrait):
    async def execute(self, entity):
        await entity.eat_nearby(5)
";
    let err = validate(src, never_used).unwrap_err();
    assert_eq!(reason_of(err), ReasonCode::AstAwaitOnSync);
}

#[test]
fn rejects_duplicate_source_by_hash() {
    let err = validate(VALID_TRAIT, |_| true).unwrap_err();
    assert_eq!(reason_of(err), ReasonCode::DuplicateCode);
}

#[test]
fn content_hash_is_stable_and_content_sensitive() {
    let a = content_hash(VALID_TRAIT);
    let b = content_hash(VALID_TRAIT);
    let c = content_hash("class Other(BaseTrait):\n    async def execute(self, entity):\n        pass\n");
    assert_eq!(a, b);
    assert_ne!(a, c);
}
