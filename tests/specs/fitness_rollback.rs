// SPDX-License-Identifier: MIT

//! Scenario 5 (spec.md §8, §4.7 "Fitness rollback", §4.9 "Mutation
//! Rollback"): once an activated mutation's observation window elapses,
//! a population decline past the rollback threshold causes the Watcher to
//! publish a rollback, and the Patcher to pull the trait back out of the
//! live registry.

use std::sync::Arc;

use mp_core::{Event, FakeClock, MutationAppliedPayload, MutationId, MutationRecord, MutationStatus, TelemetryPayload};
use mp_evolution::{Patcher, Watcher};
use mp_sim::Registry;
use tempfile::tempdir;

use crate::support::{config, Fixture, VALID_TRAIT_SOURCE_V1};

fn telemetry(tick: u64, entity_count: u64) -> TelemetryPayload {
    TelemetryPayload { tick, entity_count, avg_energy: 40.0, resource_count: 10, death_stats: Default::default() }
}

#[tokio::test]
async fn a_fitness_regression_after_the_window_rolls_the_mutation_back() {
    let dir = tempdir().unwrap();
    let fixture = Fixture::new();
    let mut cfg = config();
    cfg.snapshot_interval_ticks = 10;
    cfg.fitness_rollback_threshold = 0.15;

    let clock = FakeClock::new();
    let watcher = Watcher::new(fixture.bus.clone(), cfg, clock.clone());
    let registry = Arc::new(Registry::new(3));
    let patcher = Patcher::new(fixture.bus.clone(), registry.clone(), fixture.mutation_store.clone(), fixture.cycle_store.clone());

    // Seed and activate the mutation the way the Coder/Patcher pipeline
    // would have, so the Watcher has a live trait to baseline against.
    let mutation_id = MutationId::new();
    let file_path = dir.path().join("trait_chaser_v2.py");
    std::fs::write(&file_path, VALID_TRAIT_SOURCE_V1).unwrap();
    let source_hash = mp_sim::traitlang::validate(VALID_TRAIT_SOURCE_V1, |_| false).unwrap().source_hash;
    fixture
        .mutation_store
        .put_record(&MutationRecord {
            mutation_id: mutation_id.clone(),
            plan_id: "plan-1".to_string(),
            cycle_id: "cyc-1".to_string(),
            trait_name: "chaser".to_string(),
            version: 2,
            source_hash,
            file_path: file_path.to_string_lossy().into_owned(),
            status: MutationStatus::SandboxOk,
            failure_reason: None,
            validation_log: Vec::new(),
        })
        .unwrap();
    fixture.mutation_store.put_source(&mutation_id, VALID_TRAIT_SOURCE_V1).unwrap();
    patcher
        .on_mutation_ready(&mp_core::MutationReadyPayload {
            mutation_id: mutation_id.to_string(),
            plan_id: "plan-1".to_string(),
            cycle_id: "cyc-1".to_string(),
            file_path: file_path.to_string_lossy().into_owned(),
            trait_name: "chaser".to_string(),
            version: 2,
            code_hash: String::new(),
        }, 500)
        .unwrap();
    assert!(registry.get("chaser").is_some(), "mutation activated before the rollback window");

    let mut rollback_rx = fixture.bus.subscribe("mutation_rollback");

    // The Watcher records the baseline at 100 entities when the mutation
    // activates, then observes the population at tick 1 (before the
    // window elapses: no rollback yet).
    watcher.on_telemetry(&telemetry(1, 100));
    watcher.on_mutation_applied(&MutationAppliedPayload {
        mutation_id: mutation_id.to_string(),
        trait_name: "chaser".to_string(),
        version: 2,
        applied_at_tick: 1,
    });
    watcher.on_telemetry(&telemetry(5, 95));
    assert!(rollback_rx.try_recv().is_err(), "observation window has not elapsed yet");

    // Past the window, the population has collapsed well beyond the
    // rollback threshold.
    watcher.on_telemetry(&telemetry(12, 70));
    let Event::MutationRollback(payload) = rollback_rx.try_recv().expect("rollback published") else {
        panic!("expected mutation_rollback event");
    };
    assert_eq!(payload.trait_name, "chaser");

    patcher.on_mutation_rollback(&payload).unwrap();

    assert!(registry.get("chaser").is_none(), "rolled-back trait must leave the live registry");
    let record = fixture.mutation_store.get_record(&mutation_id).unwrap().expect("record still present");
    assert_eq!(record.status, MutationStatus::RolledBack);
}
