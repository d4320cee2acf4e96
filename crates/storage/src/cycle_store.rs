// SPDX-License-Identifier: MIT

//! The cross-process cycle lock and its inspectable record (spec.md §4.6
//! "Cycle Mutex", §6 "Cycle state (inspectable)"). `mp-evolution` owns the
//! domain semantics (who may start a cycle, what a "busy" rejection looks
//! like to the Architect); this module only owns the storage primitive:
//! `evo:cycle:lock` as an atomic `SET NX EX`, `evo:cycle:current` as the
//! plain record describing the active cycle for operator inspection.

use std::sync::Arc;
use std::time::Duration;

use mp_core::CycleStage;
use serde::{Deserialize, Serialize};

use crate::durable::{DurableStore, DurableStoreExt};
use crate::error::StorageError;

const LOCK_KEY: &str = "evo:cycle:lock";
const RECORD_KEY: &str = "evo:cycle:current";

/// The inspectable record behind `evo:cycle:current` (spec.md §4.6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleLockRecord {
    pub trigger_id: String,
    pub problem_type: String,
    pub severity: String,
    pub stage: CycleStage,
    pub started_at_epoch_ms: u64,
    pub updated_at_epoch_ms: u64,
    pub error: Option<String>,
}

pub struct CycleStore {
    durable: Arc<dyn DurableStore>,
}

impl CycleStore {
    pub fn new(durable: Arc<dyn DurableStore>) -> Self {
        Self { durable }
    }

    /// Attempt to acquire the lock for `trigger_id`. On success, also
    /// writes the inspectable record with `stage = Planning`. Returns
    /// `true` iff this call acquired it.
    pub fn try_start(
        &self,
        trigger_id: &str,
        problem_type: &str,
        severity: &str,
        ttl: Duration,
        now_epoch_ms: u64,
    ) -> Result<bool, StorageError> {
        let acquired = self
            .durable
            .set_json_nx(LOCK_KEY, serde_json::json!(trigger_id), ttl)?;
        if acquired {
            let record = CycleLockRecord {
                trigger_id: trigger_id.to_string(),
                problem_type: problem_type.to_string(),
                severity: severity.to_string(),
                stage: CycleStage::Planning,
                started_at_epoch_ms: now_epoch_ms,
                updated_at_epoch_ms: now_epoch_ms,
                error: None,
            };
            self.durable.set(RECORD_KEY, &record, Some(ttl))?;
        }
        Ok(acquired)
    }

    pub fn update_stage(&self, stage: CycleStage, now_epoch_ms: u64) -> Result<(), StorageError> {
        if let Some(mut record) = self.durable.get::<CycleLockRecord>(RECORD_KEY)? {
            record.stage = stage;
            record.updated_at_epoch_ms = now_epoch_ms;
            self.durable.set(RECORD_KEY, &record, None)?;
        }
        Ok(())
    }

    pub fn complete(&self, now_epoch_ms: u64) -> Result<(), StorageError> {
        self.update_stage(CycleStage::Done, now_epoch_ms)?;
        self.durable.delete(LOCK_KEY)
    }

    pub fn fail(&self, reason: &str, now_epoch_ms: u64) -> Result<(), StorageError> {
        if let Some(mut record) = self.durable.get::<CycleLockRecord>(RECORD_KEY)? {
            record.stage = CycleStage::Failed;
            record.updated_at_epoch_ms = now_epoch_ms;
            record.error = Some(reason.to_string());
            self.durable.set(RECORD_KEY, &record, None)?;
        }
        self.durable.delete(LOCK_KEY)
    }

    pub fn current(&self) -> Result<Option<CycleLockRecord>, StorageError> {
        self.durable.get(RECORD_KEY)
    }
}

#[cfg(test)]
#[path = "cycle_store_tests.rs"]
mod tests;
