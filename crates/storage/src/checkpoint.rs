// SPDX-License-Identifier: MIT

//! Checkpoint persistence (spec.md §4.10 "Checkpoint / Restore"). A
//! checkpoint is one durable blob keyed `evo:checkpoint:latest`: tick,
//! world params, a per-entity snapshot, and aggregate death stats. Absence
//! on startup is a fresh start, not an error.

use std::collections::HashMap;
use std::sync::Arc;

use mp_core::{DeathCause, EntityId, EntityKind, LifecycleState};
use serde::{Deserialize, Serialize};

use crate::durable::{DurableStore, DurableStoreExt};
use crate::error::StorageError;

const LATEST_KEY: &str = "evo:checkpoint:latest";

/// A single entity's restorable fields (spec.md §4.10). Traits are
/// reattached during the registry-upgrade pass of the first ticks after
/// restore rather than serialized here, since the class objects live in
/// the trait registry, not the checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointEntitySnapshot {
    pub id: EntityId,
    pub x: f64,
    pub y: f64,
    pub energy: f64,
    pub max_energy: f64,
    pub age: u64,
    pub trait_canonical_names: Vec<String>,
    pub state: LifecycleState,
    pub kind: EntityKind,
    pub parent_id: Option<EntityId>,
}

/// One durable world checkpoint (spec.md §4.10).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub tick: u64,
    pub world_width: f64,
    pub world_height: f64,
    pub entities: Vec<CheckpointEntitySnapshot>,
    pub death_stats: HashMap<DeathCause, u64>,
    /// Active trait sources at checkpoint time, keyed by canonical name, so
    /// they can be rewritten to the mutations directory and re-registered
    /// before entities resume (spec.md §4.10).
    pub active_trait_sources: HashMap<String, String>,
    pub checkpointed_at_epoch_ms: u64,
}

pub struct CheckpointStore {
    durable: Arc<dyn DurableStore>,
}

impl CheckpointStore {
    pub fn new(durable: Arc<dyn DurableStore>) -> Self {
        Self { durable }
    }

    pub fn save(&self, checkpoint: &Checkpoint) -> Result<(), StorageError> {
        self.durable.set(LATEST_KEY, checkpoint, None)
    }

    /// `None` means no prior checkpoint exists: a fresh start (spec.md
    /// §4.10 "Absence of a checkpoint is a fresh start").
    pub fn load_latest(&self) -> Result<Option<Checkpoint>, StorageError> {
        self.durable.get(LATEST_KEY)
    }
}

#[cfg(test)]
#[path = "checkpoint_tests.rs"]
mod tests;
