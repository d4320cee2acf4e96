// SPDX-License-Identifier: MIT

//! Mutation-record persistence (spec.md §6 "Mutation record (durable +
//! cache)"): `evo:mutation:{id}` holds the metadata, `evo:mutation:{id}:source`
//! holds the source text, both with a 7-day TTL; `evo:mutation:hashes` is
//! the content-hash dedup set the Code Validator's step 11 checks against.

use std::sync::Arc;
use std::time::Duration;

use mp_core::{MutationId, MutationRecord};

use crate::durable::{DurableStore, DurableStoreExt};
use crate::error::StorageError;

/// TTL for mutation records and their source text (spec.md §6).
pub const MUTATION_RECORD_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

const HASHES_SET_KEY: &str = "evo:mutation:hashes";

pub struct MutationStore {
    durable: Arc<dyn DurableStore>,
}

impl MutationStore {
    pub fn new(durable: Arc<dyn DurableStore>) -> Self {
        Self { durable }
    }

    fn record_key(id: &MutationId) -> String {
        format!("evo:mutation:{id}")
    }

    fn source_key(id: &MutationId) -> String {
        format!("evo:mutation:{id}:source")
    }

    pub fn put_record(&self, record: &MutationRecord) -> Result<(), StorageError> {
        self.durable.set(&Self::record_key(&record.mutation_id), record, Some(MUTATION_RECORD_TTL))
    }

    pub fn get_record(&self, id: &MutationId) -> Result<Option<MutationRecord>, StorageError> {
        self.durable.get(&Self::record_key(id))
    }

    pub fn put_source(&self, id: &MutationId, source: &str) -> Result<(), StorageError> {
        self.durable.set(&Self::source_key(id), &source, Some(MUTATION_RECORD_TTL))
    }

    pub fn get_source(&self, id: &MutationId) -> Result<Option<String>, StorageError> {
        self.durable.get(&Self::source_key(id))
    }

    /// Has `source_hash` already been used by a previously-loaded trait
    /// (spec.md §4.5 step 11)?
    pub fn is_hash_used(&self, source_hash: &str) -> Result<bool, StorageError> {
        self.durable.sismember(HASHES_SET_KEY, source_hash)
    }

    /// Mark `source_hash` as used. Called by the Patcher after a
    /// successful load, never by the Validator itself, so a failed
    /// validation pass doesn't poison the dedup set (spec.md §4.5).
    pub fn mark_hash_used(&self, source_hash: &str) -> Result<bool, StorageError> {
        self.durable.sadd(HASHES_SET_KEY, source_hash)
    }
}

#[cfg(test)]
#[path = "mutation_store_tests.rs"]
mod tests;
