// SPDX-License-Identifier: MIT

//! Tree-walking interpreter for a validated trait-script module. Evaluates
//! exactly one class's `execute(self, entity)` method per call, dispatching
//! `entity.<attr>` reads and `entity.<method>(...)` calls to the [`EntityApi`]
//! implementation the Trait Executor supplies (spec.md §4.3), and `math.*`
//! / `random.*` calls to a small built-in set.
//!
//! There is no real async runtime backing `await`: the language has no I/O,
//! so `Expr::Await` simply evaluates its inner expression. Wall-clock budget
//! enforcement (spec.md §4.3 per-call timeout τ) happens by checking a
//! deadline every [`BUDGET_CHECK_INTERVAL`] evaluation steps, since a
//! synchronous tree walk can't be preempted by `tokio::time::timeout`
//! without an explicit yield point.

use std::collections::HashMap;
use std::time::Instant;

use super::ast::{AugOp, BinOp, BoolOp, ClassDef, CmpOp, Expr, Module, Stmt};
use super::error::ScriptError;

/// How many evaluation steps pass between wall-clock deadline checks.
const BUDGET_CHECK_INTERVAL: u64 = 256;

/// The Entity API surface a trait script is allowed to touch (spec.md §4.5
/// step 7: fields `id, x, y, energy, max_energy, age, max_age,
/// metabolism_rate, traits, state, entity_type`; methods `move, eat_nearby,
/// attack_nearby, is_alive, deactivate_trait, activate_trait`).
pub trait EntityApi {
    fn id(&self) -> String;
    fn x(&self) -> f64;
    fn y(&self) -> f64;
    fn energy(&self) -> f64;
    fn max_energy(&self) -> f64;
    fn age(&self) -> f64;
    fn max_age(&self) -> f64;
    fn metabolism_rate(&self) -> f64;
    fn state(&self) -> String;
    fn entity_type(&self) -> String;
    fn trait_count(&self) -> f64;

    /// Move by `(dx, dy)`, clamped to `MAX_MOVE_PER_TICK` (spec.md §8
    /// "Movement clamp").
    fn move_by(&mut self, dx: f64, dy: f64);
    /// Consume the nearest resource within `radius`; returns the energy
    /// gained (0.0 if nothing was in range).
    fn eat_nearby(&mut self, radius: f64) -> f64;
    /// Attack the nearest eligible target within `radius`; returns `true`
    /// iff a target was hit.
    fn attack_nearby(&mut self, radius: f64) -> bool;
    fn is_alive(&self) -> bool;
    fn deactivate_trait(&mut self, name: &str);
    fn activate_trait(&mut self, name: &str);
}

/// A trait-script runtime value. Deliberately small: the language has no
/// lists, dicts, or user-defined types beyond the one trait class.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    None,
}

impl Value {
    fn as_f64(&self) -> Result<f64, ScriptError> {
        match self {
            Value::Int(v) => Ok(*v as f64),
            Value::Float(v) => Ok(*v),
            Value::Bool(v) => Ok(if *v { 1.0 } else { 0.0 }),
            other => Err(ScriptError::Runtime(format!("expected a number, found {other:?}"))),
        }
    }

    fn truthy(&self) -> bool {
        match self {
            Value::Int(v) => *v != 0,
            Value::Float(v) => *v != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Bool(b) => *b,
            Value::None => false,
        }
    }
}

/// What a block of statements did: ran off the end, or returned early.
enum Flow {
    Normal,
    Return,
}

/// Find the trait class in `module` and run its `execute(self, entity)`
/// method once against `entity`. `deadline` is the per-call timeout
/// (spec.md §4.3 τ); exceeding it aborts with [`ScriptError::Timeout`].
pub fn run_execute(
    module: &Module,
    class_name: &str,
    entity: &mut dyn EntityApi,
    deadline: Instant,
) -> Result<(), ScriptError> {
    let class = module
        .classes
        .iter()
        .find(|c| c.name == class_name)
        .ok_or_else(|| ScriptError::Runtime(format!("no class named {class_name}")))?;
    let method = class_execute_method(class)
        .ok_or_else(|| ScriptError::Runtime("class has no execute method".to_string()))?;

    let mut interp = Interpreter { entity, deadline, steps: 0 };
    let mut locals: HashMap<String, Value> = HashMap::new();
    interp.exec_block(&method.body, &mut locals)?;
    Ok(())
}

fn class_execute_method(class: &ClassDef) -> Option<&super::ast::FunctionDef> {
    class.methods.iter().find(|m| m.name == "execute")
}

pub struct Interpreter<'a> {
    entity: &'a mut dyn EntityApi,
    deadline: Instant,
    steps: u64,
}

impl<'a> Interpreter<'a> {
    fn check_budget(&mut self) -> Result<(), ScriptError> {
        self.steps += 1;
        if self.steps % BUDGET_CHECK_INTERVAL == 0 && Instant::now() >= self.deadline {
            return Err(ScriptError::Timeout(std::time::Duration::from_millis(0)));
        }
        Ok(())
    }

    fn exec_block(&mut self, stmts: &[Stmt], locals: &mut HashMap<String, Value>) -> Result<Flow, ScriptError> {
        for stmt in stmts {
            match self.exec_stmt(stmt, locals)? {
                Flow::Normal => {}
                Flow::Return => return Ok(Flow::Return),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt, locals: &mut HashMap<String, Value>) -> Result<Flow, ScriptError> {
        self.check_budget()?;
        match stmt {
            Stmt::Assign { target, value } => {
                let v = self.eval(value, locals)?;
                locals.insert(target.clone(), v);
                Ok(Flow::Normal)
            }
            Stmt::AugAssign { target, op, value } => {
                let current = locals
                    .get(target)
                    .cloned()
                    .ok_or_else(|| ScriptError::Runtime(format!("unbound name {target}")))?;
                let rhs = self.eval(value, locals)?;
                let result = match op {
                    AugOp::Add => current.as_f64()? + rhs.as_f64()?,
                    AugOp::Sub => current.as_f64()? - rhs.as_f64()?,
                };
                locals.insert(target.clone(), Value::Float(result));
                Ok(Flow::Normal)
            }
            Stmt::ExprStmt(expr) => {
                self.eval(expr, locals)?;
                Ok(Flow::Normal)
            }
            Stmt::If { cond, then_body, elifs, else_body } => {
                if self.eval(cond, locals)?.truthy() {
                    return self.exec_block(then_body, locals);
                }
                for (c, body) in elifs {
                    if self.eval(c, locals)?.truthy() {
                        return self.exec_block(body, locals);
                    }
                }
                self.exec_block(else_body, locals)
            }
            Stmt::ForRange { var, count, body } => {
                let n = self.eval(count, locals)?.as_f64()? as i64;
                for i in 0..n.max(0) {
                    locals.insert(var.clone(), Value::Int(i));
                    if let Flow::Return = self.exec_block(body, locals)? {
                        return Ok(Flow::Return);
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Try { body, except_body } => match self.exec_block(body, locals) {
                Ok(flow) => Ok(flow),
                Err(ScriptError::Timeout(d)) => Err(ScriptError::Timeout(d)),
                Err(_) => self.exec_block(except_body, locals),
            },
            Stmt::Return(_) => Ok(Flow::Return),
            Stmt::Pass => Ok(Flow::Normal),
        }
    }

    fn eval(&mut self, expr: &Expr, locals: &mut HashMap<String, Value>) -> Result<Value, ScriptError> {
        self.check_budget()?;
        match expr {
            Expr::IntLit(v) => Ok(Value::Int(*v)),
            Expr::FloatLit(v) => Ok(Value::Float(*v)),
            Expr::StrLit(v) => Ok(Value::Str(v.clone())),
            Expr::BoolLit(v) => Ok(Value::Bool(*v)),
            Expr::NoneLit => Ok(Value::None),
            Expr::Name(n) => locals
                .get(n)
                .cloned()
                .ok_or_else(|| ScriptError::Runtime(format!("unbound name {n}"))),
            Expr::Attribute { base, attr } => self.eval_attribute(base, attr),
            Expr::Call { func, args } => self.eval_call(func, args, locals),
            Expr::Await(inner) => self.eval(inner, locals),
            Expr::UnaryNeg(inner) => Ok(Value::Float(-self.eval(inner, locals)?.as_f64()?)),
            Expr::UnaryNot(inner) => Ok(Value::Bool(!self.eval(inner, locals)?.truthy())),
            Expr::BinOp { op, lhs, rhs } => {
                let l = self.eval(lhs, locals)?.as_f64()?;
                let r = self.eval(rhs, locals)?.as_f64()?;
                Ok(Value::Float(match op {
                    BinOp::Add => l + r,
                    BinOp::Sub => l - r,
                    BinOp::Mul => l * r,
                    BinOp::Div => {
                        if r == 0.0 {
                            return Err(ScriptError::Runtime("division by zero".to_string()));
                        }
                        l / r
                    }
                    BinOp::Mod => {
                        if r == 0.0 {
                            return Err(ScriptError::Runtime("modulo by zero".to_string()));
                        }
                        l % r
                    }
                    BinOp::Pow => l.powf(r),
                }))
            }
            Expr::BoolOp { op, lhs, rhs } => {
                let l = self.eval(lhs, locals)?;
                match op {
                    BoolOp::And => {
                        if !l.truthy() {
                            Ok(l)
                        } else {
                            self.eval(rhs, locals)
                        }
                    }
                    BoolOp::Or => {
                        if l.truthy() {
                            Ok(l)
                        } else {
                            self.eval(rhs, locals)
                        }
                    }
                }
            }
            Expr::Compare { op, lhs, rhs } => {
                let l = self.eval(lhs, locals)?;
                let r = self.eval(rhs, locals)?;
                Ok(Value::Bool(compare(op, &l, &r)?))
            }
        }
    }

    /// Resolve a bare attribute read. Only `entity.<field>` is a value;
    /// `math`/`random` only appear as call targets, and the validator has
    /// already rejected anything else.
    fn eval_attribute(&mut self, base: &Expr, attr: &str) -> Result<Value, ScriptError> {
        if let Expr::Name(name) = base {
            if name == "entity" {
                return self.read_entity_field(attr);
            }
            if name == "math" && attr == "pi" {
                return Ok(Value::Float(std::f64::consts::PI));
            }
        }
        Err(ScriptError::Runtime(format!("unsupported attribute access on {base:?}.{attr}")))
    }

    fn read_entity_field(&self, attr: &str) -> Result<Value, ScriptError> {
        Ok(match attr {
            "id" => Value::Str(self.entity.id()),
            "x" => Value::Float(self.entity.x()),
            "y" => Value::Float(self.entity.y()),
            "energy" => Value::Float(self.entity.energy()),
            "max_energy" => Value::Float(self.entity.max_energy()),
            "age" => Value::Float(self.entity.age()),
            "max_age" => Value::Float(self.entity.max_age()),
            "metabolism_rate" => Value::Float(self.entity.metabolism_rate()),
            "state" => Value::Str(self.entity.state()),
            "entity_type" => Value::Str(self.entity.entity_type()),
            "traits" => Value::Float(self.entity.trait_count()),
            other => return Err(ScriptError::Runtime(format!("unknown entity field {other}"))),
        })
    }

    fn eval_call(
        &mut self,
        func: &Expr,
        args: &[Expr],
        locals: &mut HashMap<String, Value>,
    ) -> Result<Value, ScriptError> {
        let Expr::Attribute { base, attr } = func else {
            return Err(ScriptError::Runtime("only namespaced calls are supported".to_string()));
        };
        let Expr::Name(namespace) = base.as_ref() else {
            return Err(ScriptError::Runtime("unsupported call target".to_string()));
        };

        let mut values = Vec::with_capacity(args.len());
        for a in args {
            values.push(self.eval(a, locals)?);
        }

        match namespace.as_str() {
            "entity" => self.call_entity_method(attr, &values),
            "math" => call_math(attr, &values),
            "random" => call_random(attr, &values),
            other => Err(ScriptError::Runtime(format!("unknown call namespace {other}"))),
        }
    }

    fn call_entity_method(&mut self, method: &str, args: &[Value]) -> Result<Value, ScriptError> {
        match method {
            "move" => {
                let dx = arg_f64(args, 0)?;
                let dy = arg_f64(args, 1)?;
                self.entity.move_by(dx, dy);
                Ok(Value::None)
            }
            "eat_nearby" => {
                let radius = arg_f64(args, 0)?;
                Ok(Value::Float(self.entity.eat_nearby(radius)))
            }
            "attack_nearby" => {
                let radius = arg_f64(args, 0)?;
                Ok(Value::Bool(self.entity.attack_nearby(radius)))
            }
            "is_alive" => Ok(Value::Bool(self.entity.is_alive())),
            "deactivate_trait" => {
                let name = arg_str(args, 0)?;
                self.entity.deactivate_trait(&name);
                Ok(Value::None)
            }
            "activate_trait" => {
                let name = arg_str(args, 0)?;
                self.entity.activate_trait(&name);
                Ok(Value::None)
            }
            other => Err(ScriptError::Runtime(format!("unknown entity method {other}"))),
        }
    }
}

fn arg_f64(args: &[Value], i: usize) -> Result<f64, ScriptError> {
    args.get(i).ok_or_else(|| ScriptError::Runtime("missing argument".to_string()))?.as_f64()
}

fn arg_str(args: &[Value], i: usize) -> Result<String, ScriptError> {
    match args.get(i) {
        Some(Value::Str(s)) => Ok(s.clone()),
        _ => Err(ScriptError::Runtime("expected a string argument".to_string())),
    }
}

fn compare(op: &CmpOp, lhs: &Value, rhs: &Value) -> Result<bool, ScriptError> {
    if let (Value::Str(a), Value::Str(b)) = (lhs, rhs) {
        return Ok(match op {
            CmpOp::Eq => a == b,
            CmpOp::NotEq => a != b,
            CmpOp::Lt => a < b,
            CmpOp::Gt => a > b,
            CmpOp::Le => a <= b,
            CmpOp::Ge => a >= b,
        });
    }
    let a = lhs.as_f64()?;
    let b = rhs.as_f64()?;
    Ok(match op {
        CmpOp::Eq => a == b,
        CmpOp::NotEq => a != b,
        CmpOp::Lt => a < b,
        CmpOp::Gt => a > b,
        CmpOp::Le => a <= b,
        CmpOp::Ge => a >= b,
    })
}

fn call_math(func: &str, args: &[Value]) -> Result<Value, ScriptError> {
    let x = || arg_f64(args, 0);
    Ok(Value::Float(match func {
        "sqrt" => x()?.sqrt(),
        "fabs" | "abs" => x()?.abs(),
        "floor" => x()?.floor(),
        "ceil" => x()?.ceil(),
        "sin" => x()?.sin(),
        "cos" => x()?.cos(),
        "pow" => x()?.powf(arg_f64(args, 1)?),
        other => return Err(ScriptError::Runtime(format!("unknown math.{other}"))),
    }))
}

fn call_random(func: &str, args: &[Value]) -> Result<Value, ScriptError> {
    // The interpreter has no RNG handle of its own (trait scripts are
    // validated and run deterministically-enough for the tick budget);
    // `random.random()`/`uniform`/`randint` draw from a thread-local
    // generator seeded once per process, which is adequate since trait
    // code only uses randomness for behavioral variety, not anything
    // security- or fairness-sensitive.
    use std::cell::RefCell;
    thread_local! {
        static RNG: RefCell<crate::rng::Rng> = RefCell::new(crate::rng::Rng::from_entropy());
    }
    RNG.with(|rng| {
        let mut rng = rng.borrow_mut();
        Ok(match func {
            "random" => Value::Float(rng.next_f64()),
            "uniform" => Value::Float(rng.uniform(arg_f64(args, 0)?, arg_f64(args, 1)?)),
            "randint" => {
                let lo = arg_f64(args, 0)? as i64;
                let hi = arg_f64(args, 1)? as i64;
                Value::Int(rng.range_i64(lo, hi + 1))
            }
            other => return Err(ScriptError::Runtime(format!("unknown random.{other}"))),
        })
    })
}

#[cfg(test)]
#[path = "interpreter_tests.rs"]
mod tests;
