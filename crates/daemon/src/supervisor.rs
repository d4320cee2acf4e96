// SPDX-License-Identifier: MIT

//! Soft-restart supervision: periodically checks the tick counter and the
//! mutation counter against operator-configured thresholds and requests a
//! graceful shutdown once either is crossed, so a long-lived `morphicd` can
//! be recycled (picked back up by an external process manager) before
//! per-tick allocator fragmentation or trait-registry churn becomes a
//! problem. Disabled unless at least one of `GENESIS_SOFT_RESTART_TICK_THRESHOLD`
//! or `GENESIS_SOFT_RESTART_MUTATION_THRESHOLD` is set.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::env;

pub struct Supervisor {
    tick_counter: Arc<AtomicU64>,
    mutation_counter: Arc<AtomicU64>,
    shutdown: CancellationToken,
}

impl Supervisor {
    pub fn new(tick_counter: Arc<AtomicU64>, mutation_counter: Arc<AtomicU64>, shutdown: CancellationToken) -> Self {
        Self { tick_counter, mutation_counter, shutdown }
    }

    /// Runs until `shutdown` is cancelled by any party, including itself.
    pub async fn run(self) {
        let tick_threshold = env::soft_restart_tick_threshold();
        let mutation_threshold = env::soft_restart_mutation_threshold();
        if tick_threshold.is_none() && mutation_threshold.is_none() {
            return;
        }
        let interval = env::soft_restart_check_interval();

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    let tick = self.tick_counter.load(Ordering::Relaxed);
                    if tick_threshold.is_some_and(|threshold| tick >= threshold) {
                        tracing::info!(tick, threshold = tick_threshold, "soft restart tick threshold reached, requesting shutdown");
                        self.shutdown.cancel();
                        return;
                    }
                    let mutations = self.mutation_counter.load(Ordering::Relaxed);
                    if mutation_threshold.is_some_and(|threshold| mutations >= threshold) {
                        tracing::info!(mutations, threshold = mutation_threshold, "soft restart mutation threshold reached, requesting shutdown");
                        self.shutdown.cancel();
                        return;
                    }
                }
                _ = self.shutdown.cancelled() => return,
            }
        }
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
