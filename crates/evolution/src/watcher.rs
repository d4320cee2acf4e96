// SPDX-License-Identifier: MIT

//! The Watcher (spec.md §4.7): subscribes to telemetry, evaluates fitness
//! regressions for mutations past their observation window, runs the pure
//! anomaly detector in [`crate::anomaly`] against each snapshot, and
//! publishes Evolution Triggers subject to the cooldown. The periodic
//! "keep improving" trigger (step 6) piggybacks on the telemetry cadence
//! rather than its own wall-clock timer, so the whole agent stays a pure
//! function of "snapshot in, bus events out" and is testable without a
//! real clock driving a `tokio::time::interval`.

use std::sync::Arc;

use mp_core::{
    Clock, Config, CycleId, Event, EvolutionTriggerPayload, EvolutionWorldContext, FeedPayload,
    MutationAppliedPayload, MutationRollbackPayload, SystemClock, TelemetryPayload, WorldSnapshot,
};
use mp_bus::EventBus;
use parking_lot::Mutex;

use crate::anomaly::{detect_anomalies, fitness_delta, is_fitness_regression, most_severe};

const FEED_SOURCE: &str = "watcher";

/// Fitness baseline recorded when a mutation is activated (spec.md §4.7
/// "Baselines for fitness are recorded when a MutationApplied event
/// arrives").
#[derive(Debug, Clone)]
struct FitnessBaseline {
    mutation_id: String,
    trait_name: String,
    baseline_count: u64,
    window_starts_after_tick: u64,
}

struct WatcherState {
    last_snapshot: Option<TelemetryPayload>,
    pending_baselines: Vec<FitnessBaseline>,
    last_trigger_at_ms: Option<u64>,
    last_periodic_at_ms: u64,
}

/// Subscribes to telemetry and mutation-applied, publishes Evolution
/// Triggers, feed messages, and Mutation Rollback events. Generic over the
/// clock so tests can drive it with [`mp_core::FakeClock`]; daemon wiring
/// uses the default [`SystemClock`].
pub struct Watcher<C: Clock = SystemClock> {
    bus: Arc<dyn EventBus>,
    config: Config,
    clock: C,
    state: Mutex<WatcherState>,
}

impl<C: Clock + 'static> Watcher<C> {
    pub fn new(bus: Arc<dyn EventBus>, config: Config, clock: C) -> Self {
        let last_periodic_at_ms = clock.epoch_ms();
        Self {
            bus,
            config,
            clock,
            state: Mutex::new(WatcherState {
                last_snapshot: None,
                pending_baselines: Vec::new(),
                last_trigger_at_ms: None,
                last_periodic_at_ms,
            }),
        }
    }

    /// Record a fitness baseline when a mutation activates (spec.md §4.7).
    pub fn on_mutation_applied(&self, payload: &MutationAppliedPayload) {
        let mut state = self.state.lock();
        let Some(prior) = state.last_snapshot.clone() else {
            return;
        };
        state.pending_baselines.push(FitnessBaseline {
            mutation_id: payload.mutation_id.clone(),
            trait_name: payload.trait_name.clone(),
            baseline_count: prior.entity_count,
            window_starts_after_tick: prior.tick,
        });
    }

    /// Drive steps 1-6 of spec.md §4.7 from one telemetry payload.
    pub fn on_telemetry(&self, payload: &TelemetryPayload) {
        let mut state = self.state.lock();
        state.last_snapshot = Some(payload.clone());

        self.evaluate_fitness(&mut state, payload);

        let anomalies = detect_anomalies(&to_world_snapshot(payload), &self.config);
        if !anomalies.is_empty() {
            let shared_cycle_id = CycleId::new().to_string();
            for anomaly in &anomalies {
                self.publish_feed(&format!(
                    "{} anomaly detected ({})",
                    anomaly.problem_type, anomaly.severity
                ));
            }

            let cooldown_elapsed = state.last_trigger_at_ms.map_or(true, |last| {
                self.clock.epoch_ms().saturating_sub(last) >= self.config.evolution_cooldown_sec * 1000
            });

            if cooldown_elapsed {
                if let Some(anomaly) = most_severe(&anomalies) {
                    self.bus
                        .publish(Event::EvolutionTrigger(EvolutionTriggerPayload {
                            trigger_id: CycleId::new().to_string(),
                            cycle_id: shared_cycle_id,
                            problem_type: anomaly.problem_type.to_string(),
                            severity: anomaly.severity.to_string(),
                            affected_entities: payload.entity_count,
                            suggested_area: None,
                            snapshot_key: WorldSnapshot::cache_key(payload.tick),
                            world_context: world_context_of(payload),
                        }))
                        .ok();
                    state.last_trigger_at_ms = Some(self.clock.epoch_ms());
                }
            }
        }

        self.maybe_fire_periodic(&mut state, payload);
    }

    fn evaluate_fitness(&self, state: &mut WatcherState, payload: &TelemetryPayload) {
        let window = self.config.snapshot_interval_ticks.max(1);
        let mut still_pending = Vec::new();

        for baseline in state.pending_baselines.drain(..) {
            if payload.tick < baseline.window_starts_after_tick + window {
                still_pending.push(baseline);
                continue;
            }

            let delta = fitness_delta(baseline.baseline_count, payload.entity_count);
            if is_fitness_regression(delta, self.config.fitness_rollback_threshold) {
                self.bus
                    .publish(Event::MutationRollback(MutationRollbackPayload {
                        mutation_id: baseline.mutation_id.clone(),
                        trait_name: baseline.trait_name.clone(),
                        reason: format!(
                            "fitness delta {:.2} below threshold {:.2}",
                            delta, self.config.fitness_rollback_threshold
                        ),
                        fitness_delta: delta,
                    }))
                    .ok();
                self.publish_feed(&format!(
                    "fitness rollback for {}: delta {:.2}",
                    baseline.trait_name, delta
                ));
                // Dropped: spec.md §4.7 "drop the pending record" either way
                // once the window has elapsed, regression or not.
            }
        }

        state.pending_baselines = still_pending;
    }

    fn maybe_fire_periodic(&self, state: &mut WatcherState, payload: &TelemetryPayload) {
        let interval_ms = self.config.periodic_evolution_interval_sec * 1000;
        let now_ms = self.clock.epoch_ms();
        if now_ms.saturating_sub(state.last_periodic_at_ms) < interval_ms {
            return;
        }

        self.bus
            .publish(Event::EvolutionTrigger(EvolutionTriggerPayload {
                trigger_id: CycleId::new().to_string(),
                cycle_id: CycleId::new().to_string(),
                problem_type: "periodic_improvement".to_string(),
                severity: "low".to_string(),
                affected_entities: payload.entity_count,
                suggested_area: None,
                snapshot_key: WorldSnapshot::cache_key(payload.tick),
                world_context: world_context_of(payload),
            }))
            .ok();

        state.last_periodic_at_ms = now_ms;
        state.last_trigger_at_ms = Some(now_ms);
    }

    fn publish_feed(&self, message: &str) {
        self.bus
            .publish(Event::Feed(FeedPayload { source: FEED_SOURCE.to_string(), message: message.to_string() }))
            .ok();
    }

    /// Subscribe to telemetry and mutation-applied and run forever,
    /// dispatching to [`Watcher::on_telemetry`] / [`Watcher::on_mutation_applied`].
    /// The long-lived task `mp-daemon` spawns (spec.md §5 "Watcher loop").
    pub async fn run(self: Arc<Self>) {
        let mut telemetry_rx = self.bus.subscribe("telemetry");
        let mut applied_rx = self.bus.subscribe("mutation_applied");
        loop {
            tokio::select! {
                event = telemetry_rx.recv() => {
                    match event {
                        Ok(Event::Telemetry(payload)) => self.on_telemetry(&payload),
                        Ok(_) => {}
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
                event = applied_rx.recv() => {
                    match event {
                        Ok(Event::MutationApplied(payload)) => self.on_mutation_applied(&payload),
                        Ok(_) => {}
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        }
    }
}

fn world_context_of(payload: &TelemetryPayload) -> EvolutionWorldContext {
    EvolutionWorldContext {
        entity_count: payload.entity_count,
        avg_energy: payload.avg_energy,
        resource_count: payload.resource_count,
        death_stats: payload.death_stats.clone(),
    }
}

fn to_world_snapshot(payload: &TelemetryPayload) -> mp_core::WorldSnapshot {
    mp_core::WorldSnapshot {
        tick: payload.tick,
        entity_count: payload.entity_count,
        avg_energy: payload.avg_energy,
        resource_count: payload.resource_count,
        death_stats: payload.death_stats.clone(),
        timestamp_epoch_ms: 0,
    }
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
