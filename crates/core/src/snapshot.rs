// SPDX-License-Identifier: MIT

//! World snapshots (spec.md §3 "World Snapshot").

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::entity::DeathCause;

/// An immutable record of world aggregate state at a tick. Produced by the
/// tick engine's telemetry stage, cached out-of-core with a TTL, and
/// consumed by the Watcher for anomaly detection and fitness evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub tick: u64,
    pub entity_count: u64,
    pub avg_energy: f64,
    pub resource_count: u64,
    pub death_stats: HashMap<DeathCause, u64>,
    pub timestamp_epoch_ms: u64,
}

impl WorldSnapshot {
    /// The out-of-core cache key this snapshot is published under
    /// (spec.md §6 "World snapshot cache").
    pub fn cache_key(tick: u64) -> String {
        format!("ws:snapshot:{tick}")
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
