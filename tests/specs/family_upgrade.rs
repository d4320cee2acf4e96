// SPDX-License-Identifier: MIT

//! Scenario 4 (spec.md §8, §4.4 "Trait Registry", §4.9 "Patcher"): a
//! second mutation for an already-active trait family replaces it in
//! place — same canonical name, same class, new behavior — rather than
//! creating a second family.

use std::sync::Arc;

use mp_core::{Event, MutationId, MutationRecord, MutationStatus, MutationReadyPayload};
use mp_evolution::Patcher;
use mp_sim::Registry;
use tempfile::tempdir;

use crate::support::{Fixture, VALID_TRAIT_SOURCE_V1, VALID_TRAIT_SOURCE_V2};

fn seed(fixture: &Fixture, dir: &std::path::Path, version: u64, source: &str) -> MutationReadyPayload {
    let mutation_id = MutationId::new();
    let file_path = dir.join(format!("trait_energy_saver_v{version}.py"));
    std::fs::write(&file_path, source).unwrap();

    let record = MutationRecord {
        mutation_id: mutation_id.clone(),
        plan_id: "plan-1".to_string(),
        cycle_id: "cyc-1".to_string(),
        trait_name: "energy_saver".to_string(),
        version,
        source_hash: mp_sim::traitlang::validate(source, |_| false).unwrap().source_hash,
        file_path: file_path.to_string_lossy().into_owned(),
        status: MutationStatus::SandboxOk,
        failure_reason: None,
        validation_log: Vec::new(),
    };
    fixture.mutation_store.put_record(&record).unwrap();
    fixture.mutation_store.put_source(&mutation_id, source).unwrap();

    MutationReadyPayload {
        mutation_id: mutation_id.to_string(),
        plan_id: "plan-1".to_string(),
        cycle_id: "cyc-1".to_string(),
        file_path: file_path.to_string_lossy().into_owned(),
        trait_name: "energy_saver".to_string(),
        version,
        code_hash: String::new(),
    }
}

#[tokio::test]
async fn a_second_version_replaces_the_family_in_place() {
    let dir = tempdir().unwrap();
    let fixture = Fixture::new();
    let registry = Arc::new(Registry::new(3));
    let patcher = Patcher::new(fixture.bus.clone(), registry.clone(), fixture.mutation_store.clone(), fixture.cycle_store.clone());
    let mut applied_rx = fixture.bus.subscribe("mutation_applied");

    let v1 = seed(&fixture, dir.path(), 1, VALID_TRAIT_SOURCE_V1);
    patcher.on_mutation_ready(&v1, 1_000).unwrap();
    let Event::MutationApplied(first) = applied_rx.try_recv().expect("v1 activates") else {
        panic!("expected mutation_applied for v1");
    };
    assert_eq!(first.version, 1);

    let before = registry.version();
    let entry_v1 = registry.get("energy_saver").expect("v1 registered");
    assert_eq!(entry_v1.class_name, "EnergySaverTrait");

    let v2 = seed(&fixture, dir.path(), 2, VALID_TRAIT_SOURCE_V2);
    patcher.on_mutation_ready(&v2, 2_000).unwrap();
    let Event::MutationApplied(second) = applied_rx.try_recv().expect("v2 activates") else {
        panic!("expected mutation_applied for v2");
    };
    assert_eq!(second.version, 2);

    // Same canonical name, same class, a newer module body, and the
    // registry's monotonic version counter has moved — an in-place swap,
    // not a new family.
    let entry_v2 = registry.get("energy_saver").expect("still one family named energy_saver");
    assert_eq!(entry_v2.canonical_name, "energy_saver");
    assert_eq!(entry_v2.class_name, "EnergySaverTrait");
    assert!(registry.version() > before);
    assert_eq!(entry_v2.file_paths, vec![
        dir.path().join("trait_energy_saver_v1.py").to_string_lossy().into_owned(),
        dir.path().join("trait_energy_saver_v2.py").to_string_lossy().into_owned(),
    ]);
}
