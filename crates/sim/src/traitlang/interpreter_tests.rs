// SPDX-License-Identifier: MIT

use std::time::{Duration, Instant};

use super::*;
use crate::traitlang::parser::parse;

/// A fully in-memory stand-in for the Trait Executor's real entity
/// handle, recording calls so tests can assert on behavior instead of
/// parsing interpreter internals.
#[derive(Debug, Default)]
struct FakeEntity {
    x: f64,
    y: f64,
    energy: f64,
    max_energy: f64,
    age: f64,
    max_age: f64,
    metabolism_rate: f64,
    state: String,
    entity_type: String,
    trait_count: f64,
    alive: bool,
    eat_yield: f64,
    attack_hit: bool,
    moves: Vec<(f64, f64)>,
    deactivated: Vec<String>,
    activated: Vec<String>,
}

impl FakeEntity {
    fn new() -> Self {
        Self {
            max_energy: 100.0,
            max_age: 500.0,
            alive: true,
            entity_type: "molbot".to_string(),
            state: "active".to_string(),
            ..Default::default()
        }
    }
}

impl EntityApi for FakeEntity {
    fn id(&self) -> String {
        "ent-1".to_string()
    }
    fn x(&self) -> f64 {
        self.x
    }
    fn y(&self) -> f64 {
        self.y
    }
    fn energy(&self) -> f64 {
        self.energy
    }
    fn max_energy(&self) -> f64 {
        self.max_energy
    }
    fn age(&self) -> f64 {
        self.age
    }
    fn max_age(&self) -> f64 {
        self.max_age
    }
    fn metabolism_rate(&self) -> f64 {
        self.metabolism_rate
    }
    fn state(&self) -> String {
        self.state.clone()
    }
    fn entity_type(&self) -> String {
        self.entity_type.clone()
    }
    fn trait_count(&self) -> f64 {
        self.trait_count
    }
    fn move_by(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
        self.moves.push((dx, dy));
    }
    fn eat_nearby(&mut self, _radius: f64) -> f64 {
        self.energy += self.eat_yield;
        self.eat_yield
    }
    fn attack_nearby(&mut self, _radius: f64) -> bool {
        self.attack_hit
    }
    fn is_alive(&self) -> bool {
        self.alive
    }
    fn deactivate_trait(&mut self, name: &str) {
        self.deactivated.push(name.to_string());
    }
    fn activate_trait(&mut self, name: &str) {
        self.activated.push(name.to_string());
    }
}

fn far_deadline() -> Instant {
    Instant::now() + Duration::from_secs(60)
}

#[test]
fn runs_a_simple_forager_trait() {
    let src = "\
class Forager(BaseTrait):
    async def execute(self, entity):
        gained = entity.eat_nearby(10)
        if gained > 0:
            entity.move(1, 0)
        else:
            entity.move(0, 1)
";
    let module = parse(src).expect("parses");
    let mut entity = FakeEntity::new();
    entity.eat_yield = 5.0;

    run_execute(&module, "Forager", &mut entity, far_deadline()).expect("runs");

    assert_eq!(entity.energy, 5.0);
    assert_eq!(entity.moves, vec![(1.0, 0.0)]);
}

#[test]
fn for_range_accumulates_moves() {
    let src = "\
class Wanderer(BaseTrait):
    async def execute(self, entity):
        for i in range(3):
            entity.move(1, 0)
";
    let module = parse(src).expect("parses");
    let mut entity = FakeEntity::new();

    run_execute(&module, "Wanderer", &mut entity, far_deadline()).expect("runs");

    assert_eq!(entity.moves.len(), 3);
}

#[test]
fn try_except_falls_through_on_runtime_error() {
    let src = "\
class Risky(BaseTrait):
    async def execute(self, entity):
        try:
            x = 1 / 0
        except:
            entity.move(9, 9)
";
    let module = parse(src).expect("parses");
    let mut entity = FakeEntity::new();

    run_execute(&module, "Risky", &mut entity, far_deadline()).expect("runs");

    assert_eq!(entity.moves, vec![(9.0, 9.0)]);
}

#[test]
fn try_except_does_not_swallow_timeout() {
    let src = "\
class Spinner(BaseTrait):
    async def execute(self, entity):
        try:
            for i in range(1000000):
                entity.move(0, 0)
        except:
            entity.move(1, 1)
";
    let module = parse(src).expect("parses");
    let mut entity = FakeEntity::new();
    let deadline = Instant::now();

    let err = run_execute(&module, "Spinner", &mut entity, deadline).unwrap_err();

    assert!(matches!(err, ScriptError::Timeout(_)));
    assert!(entity.moves.iter().all(|m| *m != (1.0, 1.0)));
}

#[test]
fn deactivate_and_activate_trait_dispatch() {
    let src = "\
class SelfRegulating(BaseTrait):
    async def execute(self, entity):
        if entity.energy < 10:
            entity.deactivate_trait(\"forager\")
        else:
            entity.activate_trait(\"forager\")
";
    let module = parse(src).expect("parses");
    let mut entity = FakeEntity::new();
    entity.energy = 1.0;

    run_execute(&module, "SelfRegulating", &mut entity, far_deadline()).expect("runs");

    assert_eq!(entity.deactivated, vec!["forager".to_string()]);
    assert!(entity.activated.is_empty());
}

#[test]
fn math_and_comparisons_evaluate() {
    let src = "\
import math

class Circler(BaseTrait):
    async def execute(self, entity):
        r = math.sqrt(16)
        if r == 4:
            entity.move(math.pi, 0)
";
    let module = parse(src).expect("parses");
    let mut entity = FakeEntity::new();

    run_execute(&module, "Circler", &mut entity, far_deadline()).expect("runs");

    assert_eq!(entity.moves.len(), 1);
    assert!((entity.moves[0].0 - std::f64::consts::PI).abs() < 1e-9);
}

#[test]
fn unknown_class_name_is_a_runtime_error() {
    let src = "class Forager(BaseTrait):\n    async def execute(self, entity):\n        pass\n";
    let module = parse(src).expect("parses");
    let mut entity = FakeEntity::new();

    let err = run_execute(&module, "NoSuchClass", &mut entity, far_deadline()).unwrap_err();
    assert!(matches!(err, ScriptError::Runtime(_)));
}
