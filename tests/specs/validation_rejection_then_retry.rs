// SPDX-License-Identifier: MIT

//! Scenario 3 (spec.md §8, §4.5 "Code Validator", §6 "Externally-proposed
//! mutation"): an external collaborator's first proposal is rejected by
//! the validator; a corrected resubmission for the same trait is accepted
//! and makes it all the way to an activated registry entry.

use std::sync::Arc;

use mp_core::{Event, MutationStatus};
use mp_evolution::{Gatekeeper, GatekeeperError, MutationProposal, Patcher};
use mp_sim::Registry;
use tempfile::tempdir;

use crate::support::{Fixture, VALID_TRAIT_SOURCE_V1};

const AGENT_ID: &str = "external-agent-7";
const SOURCE_IP: &str = "203.0.113.9";

fn proposal(source: &str) -> MutationProposal {
    MutationProposal {
        agent_id: AGENT_ID.to_string(),
        task_id: Some("task-42".to_string()),
        trait_name: "energy_saver".to_string(),
        goal: "reduce metabolism while food is scarce".to_string(),
        source: source.to_string(),
    }
}

#[tokio::test]
async fn rejected_proposal_can_be_corrected_and_resubmitted_successfully() {
    let dir = tempdir().unwrap();
    let fixture = Fixture::new();
    let gatekeeper =
        Gatekeeper::new(fixture.bus.clone(), fixture.mutation_store.clone(), dir.path().to_string_lossy().into_owned());
    let registry = Arc::new(Registry::new(3));
    let patcher = Patcher::new(fixture.bus.clone(), registry.clone(), fixture.mutation_store.clone(), fixture.cycle_store.clone());

    let mut failed_rx = fixture.bus.subscribe("mutation_failed");
    let mut ready_rx = fixture.bus.subscribe("mutation_ready");
    let mut applied_rx = fixture.bus.subscribe("mutation_applied");

    // First submission: syntactically bogus, rejected before ever touching
    // the mutations directory.
    let err = gatekeeper.submit(&proposal("this is not valid trait-script"), SOURCE_IP, 1_000).unwrap_err();
    assert!(matches!(err, GatekeeperError::Rejected(_)));
    assert!(failed_rx.try_recv().is_ok());
    assert!(ready_rx.try_recv().is_err());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

    // The agent corrects its proposal and resubmits.
    let mutation_id = gatekeeper.submit(&proposal(VALID_TRAIT_SOURCE_V1), SOURCE_IP, 2_000).unwrap();
    let Event::MutationReady(ready) = ready_rx.try_recv().expect("corrected proposal is accepted") else {
        panic!("expected mutation_ready event");
    };
    assert_eq!(ready.trait_name, "energy_saver");

    patcher.on_mutation_ready(&ready, 3_000).unwrap();
    assert!(applied_rx.try_recv().is_ok());
    assert!(registry.get("energy_saver").is_some());

    let record = fixture.mutation_store.get_record(&mutation_id).unwrap().expect("mutation record persisted");
    assert_eq!(record.status, MutationStatus::Activated);
}
