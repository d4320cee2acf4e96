// SPDX-License-Identifier: MIT

//! Scenario 2 (spec.md §8, §4.6 "Cycle Mutex"): two Evolution Triggers
//! arriving for distinct cycles while one cycle is still in flight must
//! not both proceed — the second is skipped, and the cycle-state record
//! still reflects the first.

use std::sync::Arc;
use std::time::Duration;

use mp_core::{CycleStage, Event, EvolutionWorldContext, EvolutionTriggerPayload};
use mp_evolution::{Architect, FakeLlmClient, PlanResponse};

use crate::support::Fixture;

fn trigger(trigger_id: &str, cycle_id: &str) -> EvolutionTriggerPayload {
    EvolutionTriggerPayload {
        trigger_id: trigger_id.to_string(),
        cycle_id: cycle_id.to_string(),
        problem_type: "starvation".to_string(),
        severity: "high".to_string(),
        affected_entities: 40,
        suggested_area: None,
        snapshot_key: "ws:snapshot:10".to_string(),
        world_context: EvolutionWorldContext {
            entity_count: 40,
            avg_energy: 15.0,
            resource_count: 5,
            death_stats: Default::default(),
        },
    }
}

#[tokio::test]
async fn a_second_trigger_is_skipped_while_the_first_cycle_is_in_flight() {
    let fixture = Fixture::new();
    let llm = Arc::new(FakeLlmClient::new());
    llm.queue_plan(Ok(PlanResponse {
        trait_name: "energy_saver".to_string(),
        description: "reduce metabolism while food is scarce".to_string(),
        action_type: "new_trait".to_string(),
    }));
    let architect = Architect::new(fixture.bus.clone(), fixture.cycle_store.clone(), llm, Duration::from_secs(60));
    let mut feed_rx = fixture.bus.subscribe("feed");

    architect.on_trigger(&trigger("trig-1", "cyc-1"), 1_000).await.unwrap();
    let record = fixture.cycle_store.current().unwrap().expect("cycle record recorded");
    assert_eq!(record.trigger_id, "trig-1");
    assert_eq!(record.stage, CycleStage::Coding);

    // A second, unrelated trigger arrives moments later; it must not steal
    // the mutex out from under the first cycle. It never reaches the LLM
    // either, since the FakeLlmClient has no second plan queued and would
    // error loudly if it were called.
    architect.on_trigger(&trigger("trig-2", "cyc-2"), 1_010).await.unwrap();

    let Event::Feed(feed) = feed_rx.try_recv().expect("skipped-cycle feed message") else {
        panic!("expected feed event");
    };
    assert!(feed.message.contains("skipped"));
    assert!(feed.message.contains("cyc-2"));

    let record = fixture.cycle_store.current().unwrap().expect("cycle record still present");
    assert_eq!(record.trigger_id, "trig-1", "the in-flight cycle's record must be untouched");
    assert_eq!(record.stage, CycleStage::Coding);
}
