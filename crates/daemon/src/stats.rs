// SPDX-License-Identifier: MIT

//! Cumulative counters shared between the tick loop, the Patcher, the
//! soft-restart supervisor, and the IPC listener (`Request::Stats`). Plain
//! atomics over a lock: every field is a monotonic counter read far more
//! often than it's written, and none of the fields depend on each other
//! for consistency.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

#[derive(Default)]
pub struct Stats {
    pub tick: AtomicU64,
    pub predator_kills: AtomicU64,
    pub virus_kills: AtomicU64,
    pub predator_deaths: AtomicU64,
    pub mutations_applied: AtomicU64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            tick: self.tick.load(Ordering::Relaxed),
            predator_kills: self.predator_kills.load(Ordering::Relaxed),
            virus_kills: self.virus_kills.load(Ordering::Relaxed),
            predator_deaths: self.predator_deaths.load(Ordering::Relaxed),
            mutations_applied: self.mutations_applied.load(Ordering::Relaxed),
            soft_restart_tick_threshold: crate::env::soft_restart_tick_threshold(),
            soft_restart_mutation_threshold: crate::env::soft_restart_mutation_threshold(),
        }
    }
}

/// A point-in-time read of [`Stats`], carried over IPC as `Response::Stats`.
/// Cumulative over the process lifetime only; nothing here is persisted
/// across a restart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub tick: u64,
    pub predator_kills: u64,
    pub virus_kills: u64,
    pub predator_deaths: u64,
    pub mutations_applied: u64,
    pub soft_restart_tick_threshold: Option<u64>,
    pub soft_restart_mutation_threshold: Option<u64>,
}

#[cfg(test)]
#[path = "stats_tests.rs"]
mod tests;
