// SPDX-License-Identifier: MIT

//! Scenario 1 (spec.md §8): a starvation anomaly flows all the way
//! through Watcher -> Architect -> Coder -> Patcher into an activated
//! trait in the live registry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use mp_core::{Event, FakeClock, TelemetryPayload};
use mp_evolution::{Architect, CodeResponse, Coder, FakeLlmClient, Patcher, PlanResponse, Watcher};
use mp_sim::Registry;
use tempfile::tempdir;

use crate::support::{config, Fixture, VALID_TRAIT_SOURCE_V1};

#[tokio::test]
async fn starvation_anomaly_results_in_an_activated_mutation() {
    let dir = tempdir().unwrap();
    let fixture = Fixture::new();
    let llm = Arc::new(FakeLlmClient::new());
    llm.queue_plan(Ok(PlanResponse {
        trait_name: "energy_saver".to_string(),
        description: "reduce metabolism while food is scarce".to_string(),
        action_type: "new_trait".to_string(),
    }));
    llm.queue_code(Ok(CodeResponse { source: VALID_TRAIT_SOURCE_V1.to_string() }));

    let watcher = Watcher::new(fixture.bus.clone(), config(), FakeClock::new());
    let architect =
        Architect::new(fixture.bus.clone(), fixture.cycle_store.clone(), llm.clone(), Duration::from_secs(60));
    let coder = Coder::new(
        fixture.bus.clone(),
        fixture.mutation_store.clone(),
        llm,
        dir.path().to_string_lossy().into_owned(),
    );
    let registry = Arc::new(Registry::new(3));
    let patcher = Patcher::new(fixture.bus.clone(), registry.clone(), fixture.mutation_store.clone(), fixture.cycle_store.clone());

    let mut trigger_rx = fixture.bus.subscribe("evolution_trigger");
    let mut plan_rx = fixture.bus.subscribe("evolution_plan");
    let mut ready_rx = fixture.bus.subscribe("mutation_ready");
    let mut applied_rx = fixture.bus.subscribe("mutation_applied");

    // Step 1: a starving, otherwise healthy population (spec.md §4.7 step
    // 3 "avg_energy < 0.2 * typical_max_energy").
    let mut death_stats = HashMap::new();
    death_stats.insert(mp_core::DeathCause::Starvation, 12);
    watcher.on_telemetry(&TelemetryPayload {
        tick: 100,
        entity_count: 50,
        avg_energy: 5.0,
        resource_count: 3,
        death_stats,
    });

    let Event::EvolutionTrigger(trigger) = trigger_rx.try_recv().expect("watcher publishes a trigger") else {
        panic!("expected evolution_trigger event");
    };
    assert_eq!(trigger.problem_type, "starvation");

    // Step 2: the Architect wins the cycle mutex and asks the LLM for a plan.
    architect.on_trigger(&trigger, 1_000).await.unwrap();
    let Event::EvolutionPlan(plan) = plan_rx.try_recv().expect("architect publishes a plan") else {
        panic!("expected evolution_plan event");
    };
    assert_eq!(plan.target_class, "energy_saver");

    // Step 3: the Coder turns the plan into validated trait-script source.
    coder.on_plan(&plan).await.unwrap();
    let Event::MutationReady(ready) = ready_rx.try_recv().expect("coder publishes mutation_ready") else {
        panic!("expected mutation_ready event");
    };
    assert_eq!(ready.trait_name, "energy_saver");

    // Step 4: the Patcher loads it into the live registry.
    patcher.on_mutation_ready(&ready, 2_000).unwrap();
    let Event::MutationApplied(applied) = applied_rx.try_recv().expect("patcher publishes mutation_applied") else {
        panic!("expected mutation_applied event");
    };
    assert_eq!(applied.trait_name, "energy_saver");
    assert!(registry.get("energy_saver").is_some(), "trait should be live in the registry");
}
