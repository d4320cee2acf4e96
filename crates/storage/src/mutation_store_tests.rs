// SPDX-License-Identifier: MIT

use std::sync::Arc;

use mp_core::{MutationId, MutationRecord, MutationStatus};

use super::*;
use crate::durable::InMemoryDurableStore;

fn sample() -> MutationRecord {
    MutationRecord {
        mutation_id: MutationId::new(),
        plan_id: "plan-1".to_string(),
        cycle_id: "cyc-1".to_string(),
        trait_name: "resource_diversifier".to_string(),
        version: 1,
        source_hash: "abc123".to_string(),
        file_path: "./mutations/resource_diversifier_v1.py".to_string(),
        status: MutationStatus::Queued,
        failure_reason: None,
        validation_log: Vec::new(),
    }
}

#[test]
fn record_and_source_roundtrip() {
    let store = MutationStore::new(Arc::new(InMemoryDurableStore::new()));
    let record = sample();
    store.put_record(&record).unwrap();
    store.put_source(&record.mutation_id, "class Foo: pass").unwrap();

    let fetched = store.get_record(&record.mutation_id).unwrap().unwrap();
    assert_eq!(fetched.trait_name, "resource_diversifier");
    assert_eq!(store.get_source(&record.mutation_id).unwrap().as_deref(), Some("class Foo: pass"));
}

#[test]
fn hash_dedup_set_blocks_reuse() {
    let store = MutationStore::new(Arc::new(InMemoryDurableStore::new()));
    assert!(!store.is_hash_used("abc").unwrap());
    assert!(store.mark_hash_used("abc").unwrap());
    assert!(store.is_hash_used("abc").unwrap());
    assert!(!store.mark_hash_used("abc").unwrap());
}

#[test]
fn missing_record_is_none_not_error() {
    let store = MutationStore::new(Arc::new(InMemoryDurableStore::new()));
    assert!(store.get_record(&MutationId::new()).unwrap().is_none());
}
