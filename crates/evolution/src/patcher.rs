// SPDX-License-Identifier: MIT

//! The Patcher (spec.md §4.9): the only component that writes to the live
//! Trait Registry. Re-validates a Mutation Ready payload, swaps it into
//! the registry, evicts old file versions beyond the retention bound, and
//! reacts to fitness-rollback by unregistering a family and deleting its
//! file.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use mp_core::{
    Clock, CycleStage, Event, FailureStage, FeedPayload, MutationAppliedPayload, MutationFailedPayload,
    MutationId, MutationReadyPayload, MutationRollbackPayload, MutationStatus, TelemetryPayload,
};
use mp_bus::EventBus;
use mp_sim::Registry;
use mp_storage::{CycleStore, MutationStore};
use parking_lot::Mutex;

use crate::error::EvolutionError;

const FEED_SOURCE: &str = "patcher";

struct Activation {
    mutation_id: MutationId,
}

pub struct Patcher {
    bus: Arc<dyn EventBus>,
    registry: Arc<Registry>,
    mutation_store: Arc<MutationStore>,
    cycle_store: Arc<CycleStore>,
    active: Mutex<HashMap<String, Activation>>,
    last_tick: Mutex<u64>,
    mutations_applied: AtomicU64,
}

impl Patcher {
    pub fn new(
        bus: Arc<dyn EventBus>,
        registry: Arc<Registry>,
        mutation_store: Arc<MutationStore>,
        cycle_store: Arc<CycleStore>,
    ) -> Self {
        Self {
            bus,
            registry,
            mutation_store,
            cycle_store,
            active: Mutex::new(HashMap::new()),
            last_tick: Mutex::new(0),
            mutations_applied: AtomicU64::new(0),
        }
    }

    pub fn on_telemetry(&self, payload: &TelemetryPayload) {
        *self.last_tick.lock() = payload.tick;
    }

    /// Cumulative count of mutations activated into the live registry over
    /// this process's lifetime, for the soft-restart supervisor and the
    /// stats IPC endpoint.
    pub fn mutations_applied(&self) -> u64 {
        self.mutations_applied.load(Ordering::Relaxed)
    }

    /// Handle a Mutation Ready event (spec.md §4.9 steps 1-5), advancing the
    /// cycle mutex through `Patching` and on to completion or failure
    /// (spec.md §4.6/§4.9; mirrors what `Architect::on_trigger` does for
    /// `Planning` -> `Coding`).
    pub fn on_mutation_ready(&self, ready: &MutationReadyPayload, now_epoch_ms: u64) -> Result<(), EvolutionError> {
        let mutation_id = MutationId::from_string(&ready.mutation_id);
        let Some(mut record) = self.mutation_store.get_record(&mutation_id)? else {
            self.fail(ready, FailureStage::Import, "no mutation record found for this id", now_epoch_ms);
            return Ok(());
        };
        let Some(source) = self.mutation_store.get_source(&mutation_id)? else {
            self.fail(ready, FailureStage::Import, "no source text found for this mutation", now_epoch_ms);
            return Ok(());
        };

        let is_hash_used = |hash: &str| self.mutation_store.is_hash_used(hash).unwrap_or(false);
        let validated = match mp_sim::traitlang::validate(&source, &is_hash_used) {
            Ok(validated) => validated,
            Err(err) => {
                record.status = MutationStatus::Failed;
                record.failure_reason = Some(err.reason_code());
                self.mutation_store.put_record(&record)?;
                self.fail(ready, FailureStage::Import, &err.to_string(), now_epoch_ms);
                return Ok(());
            }
        };

        self.cycle_store.update_stage(CycleStage::Patching, now_epoch_ms).ok();

        let evicted = self.registry.register(
            &validated.canonical_name,
            &validated.class_name,
            validated.module,
            record.file_path.clone(),
        );
        for path in &evicted {
            std::fs::remove_file(path).ok();
        }
        self.registry.register_source(&validated.canonical_name, source);
        self.mutation_store.mark_hash_used(&validated.source_hash)?;

        record.status = MutationStatus::Activated;
        self.mutation_store.put_record(&record)?;
        self.active.lock().insert(validated.canonical_name.clone(), Activation { mutation_id });
        self.mutations_applied.fetch_add(1, Ordering::Relaxed);

        self.bus.publish(Event::MutationApplied(MutationAppliedPayload {
            mutation_id: ready.mutation_id.clone(),
            trait_name: validated.canonical_name.clone(),
            version: ready.version,
            applied_at_tick: *self.last_tick.lock(),
        }))?;
        self.publish_feed(&format!("{} activated at version {}", validated.canonical_name, ready.version));
        self.cycle_store.complete(now_epoch_ms).ok();
        Ok(())
    }

    /// Handle a fitness-rollback event (spec.md §4.9 "Mutation Rollback").
    pub fn on_mutation_rollback(&self, rollback: &MutationRollbackPayload) -> Result<(), EvolutionError> {
        let Some(activation) = self.active.lock().remove(&rollback.trait_name) else {
            self.publish_feed(&format!("rollback for {} ignored: no active mutation tracked", rollback.trait_name));
            return Ok(());
        };

        if let Some(evicted) = self.registry.unregister(&rollback.trait_name) {
            for path in &evicted {
                std::fs::remove_file(path).ok();
            }
        }

        if let Some(mut record) = self.mutation_store.get_record(&activation.mutation_id)? {
            record.status = MutationStatus::RolledBack;
            self.mutation_store.put_record(&record)?;
        }

        self.publish_feed(&format!(
            "{} rolled back (fitness delta {:.2})",
            rollback.trait_name, rollback.fitness_delta
        ));
        Ok(())
    }

    fn fail(&self, ready: &MutationReadyPayload, stage: FailureStage, detail: &str, now_epoch_ms: u64) {
        self.cycle_store.fail(detail, now_epoch_ms).ok();
        self.bus
            .publish(Event::MutationFailed(MutationFailedPayload {
                mutation_id: ready.mutation_id.clone(),
                cycle_id: ready.cycle_id.clone(),
                trait_name: ready.trait_name.clone(),
                stage,
                reason: mp_core::ReasonCode::ImportFailed,
                detail: detail.to_string(),
            }))
            .ok();
        self.publish_feed(&format!("{} failed to activate: {}", ready.trait_name, detail));
    }

    fn publish_feed(&self, message: &str) {
        self.bus
            .publish(Event::Feed(FeedPayload { source: FEED_SOURCE.to_string(), message: message.to_string() }))
            .ok();
    }

    /// Subscribe to Mutation Ready, Mutation Rollback, and telemetry and
    /// dispatch forever (spec.md §5 "Patcher loop"). Generic over the clock
    /// like [`crate::Architect::run`], so the cycle mutex's TTL bookkeeping
    /// shares one clock with daemon wiring; tests call
    /// [`Patcher::on_mutation_ready`] directly instead of racing this loop.
    pub async fn run<C: Clock + 'static>(self: Arc<Self>, clock: C) {
        let mut ready_rx = self.bus.subscribe("mutation_ready");
        let mut rollback_rx = self.bus.subscribe("mutation_rollback");
        let mut telemetry_rx = self.bus.subscribe("telemetry");
        loop {
            tokio::select! {
                event = ready_rx.recv() => {
                    match event {
                        Ok(Event::MutationReady(ready)) => {
                            if let Err(err) = self.on_mutation_ready(&ready, clock.epoch_ms()) {
                                tracing::warn!(error = %err, "patcher failed to activate mutation");
                            }
                        }
                        Ok(_) => {}
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
                event = rollback_rx.recv() => {
                    match event {
                        Ok(Event::MutationRollback(rollback)) => {
                            if let Err(err) = self.on_mutation_rollback(&rollback) {
                                tracing::warn!(error = %err, "patcher failed to roll back mutation");
                            }
                        }
                        Ok(_) => {}
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
                event = telemetry_rx.recv() => {
                    match event {
                        Ok(Event::Telemetry(payload)) => self.on_telemetry(&payload),
                        Ok(_) => {}
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "patcher_tests.rs"]
mod tests;
