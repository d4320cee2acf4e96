// SPDX-License-Identifier: MIT

use mp_core::{Config, TraitHandle};

use super::*;
use crate::rng::Rng;
use crate::traitlang::parser::parse;

fn cfg() -> Config {
    let mut cfg = Config::default();
    cfg.min_population = 0; // keep population deterministic across test ticks
    cfg
}

fn engine(registry: Arc<Registry>) -> TickEngine {
    TickEngine::new(cfg(), registry, World::new(Rng::from_seed(7)))
}

fn register_trait(registry: &Registry, canonical_name: &str, class_name: &str, body: &str) {
    let src = format!(
        "class {class_name}(BaseTrait):\n    async def execute(self, entity):\n        {body}\n"
    );
    let module = parse(&src).expect("parses");
    registry.register(canonical_name, class_name, module, format!("{canonical_name}_v1.py"));
}

#[test]
fn tick_advances_the_counter_and_reports_its_own_number() {
    let registry = Arc::new(Registry::new(3));
    let mut engine = engine(registry);

    let outcome = engine.tick(1_000);
    assert_eq!(outcome.tick, 1);
    assert_eq!(engine.tick_number(), 1);

    let outcome = engine.tick(1_016);
    assert_eq!(outcome.tick, 2);
}

#[test]
fn broadcast_fires_every_second_tick() {
    let registry = Arc::new(Registry::new(3));
    let mut engine = engine(registry);

    let first = engine.tick(0);
    let second = engine.tick(0);
    assert!(!first.should_broadcast);
    assert!(second.should_broadcast);
}

#[test]
fn telemetry_snapshot_fires_on_the_configured_interval() {
    let registry = Arc::new(Registry::new(3));
    let mut engine = engine(registry);
    engine.config.snapshot_interval_ticks = 3;

    assert!(engine.tick(0).snapshot.is_none());
    assert!(engine.tick(0).snapshot.is_none());
    let outcome = engine.tick(42);
    let snapshot = outcome.snapshot.expect("snapshot due on the third tick");
    assert_eq!(snapshot.tick, 3);
    assert_eq!(snapshot.timestamp_epoch_ms, 42);
}

#[test]
fn telemetry_snapshot_resets_death_stats() {
    let registry = Arc::new(Registry::new(3));
    let mut engine = engine(registry);
    engine.config.snapshot_interval_ticks = 1;

    let id = engine.world.spawn_molbot_at(0.0, 0.0, 0);
    engine.world.mark_dead(id, mp_core::DeathCause::Starvation);

    let outcome = engine.tick(0);
    assert_eq!(outcome.reaped, 1);
    let snapshot = outcome.snapshot.expect("snapshot due every tick");
    assert_eq!(*snapshot.death_stats.get(&mp_core::DeathCause::Starvation).unwrap_or(&0), 1);
    assert!(engine.world.death_stats.is_empty());
}

#[test]
fn checkpoint_flag_fires_on_the_configured_interval() {
    let registry = Arc::new(Registry::new(3));
    let mut engine = engine(registry);
    engine.config.checkpoint_interval_ticks = 2;

    assert!(!engine.tick(0).should_checkpoint);
    assert!(engine.tick(0).should_checkpoint);
}

#[test]
fn a_starving_entity_is_reaped_before_it_gets_to_run_a_trait() {
    let registry = Arc::new(Registry::new(3));
    register_trait(&registry, "forager", "Forager", "entity.move(1, 0)");
    let mut engine = engine(registry);

    let id = engine.world.spawn_molbot_at(5.0, 5.0, 0);
    let entity = engine.world.entities.get_mut(&id).expect("present");
    entity.energy = 0.5;
    entity.metabolism_rate = 1.0;
    entity.traits.push(TraitHandle { canonical_name: "forager".to_string(), version: 1 });

    let outcome = engine.tick(0);
    assert_eq!(outcome.reaped, 1);
    assert!(engine.world.entities.get(&id).is_none());
}

#[test]
fn a_failing_trait_is_escalated_exactly_once_across_entities_and_ticks() {
    let registry = Arc::new(Registry::new(3));
    register_trait(&registry, "buggy", "Buggy", "x = 1 / 0");
    let mut engine = engine(registry);

    let a = engine.world.spawn_molbot_at(0.0, 0.0, 0);
    let b = engine.world.spawn_molbot_at(50.0, 50.0, 0);
    for id in [a, b] {
        let entity = engine.world.entities.get_mut(&id).expect("present");
        entity.energy = 1_000.0;
        entity.traits.push(TraitHandle { canonical_name: "buggy".to_string(), version: 1 });
    }

    let first = engine.tick(0);
    assert_eq!(first.newly_escalated_trait_failures, vec!["buggy".to_string()]);

    let second = engine.tick(0);
    assert!(second.newly_escalated_trait_failures.is_empty());
}

#[test]
fn registry_upgrade_pass_appends_new_families_up_to_the_active_cap() {
    let registry = Arc::new(Registry::new(3));
    register_trait(&registry, "forager", "Forager", "entity.move(1, 0)");
    let mut engine = engine(registry);
    engine.config.max_active_traits = 1;

    let id = engine.world.spawn_molbot_at(0.0, 0.0, 0);
    engine.tick(0);

    let entity = engine.world.entities.get(&id).expect("present");
    assert_eq!(entity.traits.len(), 1);
    assert_eq!(entity.traits[0].canonical_name, "forager");
}

#[test]
fn registry_upgrade_pass_bumps_the_version_of_an_already_held_family_in_place() {
    let registry = Arc::new(Registry::new(3));
    register_trait(&registry, "forager", "Forager", "entity.move(1, 0)");
    let mut engine = engine(registry);

    let id = engine.world.spawn_molbot_at(0.0, 0.0, 0);
    engine.tick(0);
    let v1 = engine.world.entities.get(&id).expect("present").traits[0].version;

    register_trait(&engine.registry, "forager", "ForagerV2", "entity.move(0, 1)");
    engine.tick(0);

    let entity = engine.world.entities.get(&id).expect("present");
    assert_eq!(entity.traits.len(), 1, "no duplicate instance of the same family");
    assert!(entity.traits[0].version > v1);
}
