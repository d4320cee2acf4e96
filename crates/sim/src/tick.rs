// SPDX-License-Identifier: MIT

//! The Tick Engine (spec.md §4.1): the fixed-cadence loop that advances the
//! whole simulation by one step. Owns the [`World`] and a shared
//! [`Registry`] and walks the twelve-step sequence on every call to
//! [`TickEngine::tick`]. I/O that crosses into the event bus, the cache, or
//! the checkpoint store is left to the caller, which reads back the
//! returned [`TickOutcome`] and the engine's public accessors — `mp-sim`
//! depends on neither `mp-bus` nor `mp-storage`, so pacing (step 12) is also
//! the caller's job, against `TickOutcome::tick_duration`.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use mp_core::{Config, EntityId, TraitHandle, WorldSnapshot};

use crate::consts::RESOURCE_RESPAWN_RATE;
use crate::executor::Executor;
use crate::physics;
use crate::registry::Registry;
use crate::world::{apply_aging_and_metabolism, World};

/// What happened during one [`TickEngine::tick`] call, for the caller to act
/// on: publish telemetry, broadcast a frame, write a checkpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub tick: u64,
    pub reaped: u32,
    /// Canonical trait names whose first-ever failure, on any entity,
    /// happened this tick (spec.md §4.3, §7 "escalation to the feed
    /// channel"). Fires at most once per name for the life of the engine.
    pub newly_escalated_trait_failures: Vec<String>,
    /// Set every 2nd tick (spec.md §4.1 step 6 "Broadcast").
    pub should_broadcast: bool,
    /// Present every `snapshot_interval_ticks` (spec.md §4.1 step 10).
    pub snapshot: Option<WorldSnapshot>,
    /// Set every `checkpoint_interval_ticks` (spec.md §4.1 step 11).
    pub should_checkpoint: bool,
    pub tick_duration: Duration,
    /// Whether `tick_duration` exceeded the configured tick rate. The loop
    /// keeps running either way; this is only a signal for operators.
    pub overran_budget: bool,
}

/// Drives a [`World`] through the fixed-cadence loop against a shared
/// [`Registry`] (spec.md §5 "Shared-resource policy": the registry is the
/// one piece of state the evolution pipeline's Patcher also writes to,
/// concurrently with the tick engine reading it via `Arc`).
pub struct TickEngine {
    pub world: World,
    registry: Arc<Registry>,
    config: Config,
    tick: u64,
    last_registry_version: u64,
    escalated_trait_failures: HashSet<String>,
}

impl TickEngine {
    pub fn new(config: Config, registry: Arc<Registry>, world: World) -> Self {
        Self {
            world,
            registry,
            config,
            tick: 0,
            last_registry_version: 0,
            escalated_trait_failures: HashSet::new(),
        }
    }

    pub fn tick_number(&self) -> u64 {
        self.tick
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Fast-forward the tick counter without running any stages, for
    /// checkpoint restore (spec.md §4.10: the restored tick is the one the
    /// checkpoint was taken at, not zero).
    pub fn set_tick_number(&mut self, tick: u64) {
        self.tick = tick;
    }

    /// Advance the simulation by one tick: every step of spec.md §4.1
    /// except pacing, which the caller performs by sleeping the remainder
    /// of `config().tick_rate()` against `TickOutcome::tick_duration`.
    pub fn tick(&mut self, now_epoch_ms: u64) -> TickOutcome {
        let started = Instant::now();
        self.tick += 1;
        let tick = self.tick;

        // Step 1: update (age, metabolism, infection, trait execution).
        let newly_escalated = self.update_stage();

        // Step 2: physics (boundary clamp, pairwise separation).
        physics::step(&mut self.world.entities, self.config.world_width, self.config.world_height);

        // Step 3: lifecycle reap.
        let reaped = self.world.reap();

        // Step 4: predator regulator.
        self.world.predator_regulator(&self.config, tick);

        // Step 5: virus regulator.
        self.world.virus_regulator(&self.config);

        // Step 6: registry upgrade pass.
        self.registry_upgrade_pass();

        // Step 7: broadcast, every 2nd tick (frame encoding is the caller's
        // job, against `self.world` read through the engine's accessors).
        let should_broadcast = tick % 2 == 0;

        // Step 8: organic growth.
        self.world.organic_growth(&self.config, tick);

        // Step 9: resource respawn.
        self.world.resource_respawn(
            RESOURCE_RESPAWN_RATE,
            self.config.world_width,
            self.config.world_height,
        );

        // Step 10: telemetry, every `snapshot_interval_ticks`.
        let snapshot_interval = self.config.snapshot_interval_ticks.max(1);
        let snapshot = if tick % snapshot_interval == 0 {
            Some(self.build_snapshot(now_epoch_ms))
        } else {
            None
        };

        // Step 11: checkpoint, every `checkpoint_interval_ticks`. Building
        // the actual `Checkpoint` record is the caller's job (it lives in
        // `mp-storage`); this is only the signal to do it.
        let checkpoint_interval = self.config.checkpoint_interval_ticks.max(1);
        let should_checkpoint = tick % checkpoint_interval == 0;

        let tick_duration = started.elapsed();
        let overran_budget = tick_duration > self.config.tick_rate();

        TickOutcome {
            tick,
            reaped,
            newly_escalated_trait_failures: newly_escalated,
            should_broadcast,
            snapshot,
            should_checkpoint,
            tick_duration,
            overran_budget,
        }
    }

    /// Step 1: age and metabolize every alive entity, reaping the ones that
    /// starve or reach `max_age` before they run a single trait, then run
    /// the survivors' trait lists with themselves removed from the store so
    /// `attack_nearby` can borrow it mutably without aliasing (spec.md §5,
    /// executor.rs). Age, metabolism rate, and energy are snapshotted
    /// before the run and restored after, except for energy gained through
    /// legitimate `eat_nearby` calls (`Entity::trait_energy_gain`), so a
    /// buggy or adversarial trait can't stop the clock or conjure energy.
    fn update_stage(&mut self) -> Vec<String> {
        let trait_timeout = self.config.trait_timeout();
        let tick_budget = self.config.tick_time_budget();
        let ids: Vec<EntityId> = self
            .world
            .entities
            .iter()
            .filter(|e| e.is_alive())
            .map(|e| e.id)
            .collect();

        let mut newly_escalated = Vec::new();

        for id in ids {
            let Some(mut entity) = self.world.entities.remove(&id) else {
                continue;
            };
            if !entity.is_alive() {
                // Killed earlier this stage by another entity's attack.
                self.world.entities.insert(entity);
                continue;
            }

            if let Some(cause) = apply_aging_and_metabolism(&mut entity) {
                self.world.entities.insert(entity);
                self.world.mark_dead(id, cause);
                continue;
            }

            let snapshot_age = entity.age;
            let snapshot_metabolism = entity.metabolism_rate;
            let snapshot_energy = entity.energy;
            entity.trait_energy_gain = 0.0;

            let executor = Executor::new(&self.registry);
            let escalated = &mut self.escalated_trait_failures;
            executor.execute_all(
                &mut entity,
                &mut self.world.entities,
                &mut self.world.environment,
                trait_timeout,
                tick_budget,
                |name| {
                    if escalated.insert(name.to_string()) {
                        newly_escalated.push(name.to_string());
                    }
                },
            );

            entity.age = snapshot_age;
            entity.metabolism_rate = snapshot_metabolism;
            let gain = entity.trait_energy_gain.max(0.0);
            entity.energy = (snapshot_energy + gain).min(entity.max_energy);

            self.world.entities.insert(entity);
        }

        newly_escalated
    }

    /// Step 6: for every living entity and every registered family, replace
    /// a same-family instance in place (a version bump; the executor always
    /// resolves the latest class by canonical name, so there's nothing else
    /// to swap) or append a fresh instance while under `max_active_traits`
    /// (spec.md §4.4, §8 "Family upgrade" law: no duplicates in the trait
    /// list). A no-op unless the registry's version has moved since the
    /// last pass.
    fn registry_upgrade_pass(&mut self) {
        let current_version = self.registry.version();
        if current_version == self.last_registry_version {
            return;
        }

        let snapshot = self.registry.snapshot();
        let max_active = self.config.max_active_traits as usize;
        for entity in self.world.entities.iter_mut().filter(|e| e.is_alive()) {
            for canonical_name in snapshot.keys() {
                if let Some(handle) =
                    entity.traits.iter_mut().find(|h| &h.canonical_name == canonical_name)
                {
                    handle.version = current_version;
                } else if entity.traits.len() < max_active {
                    entity.traits.push(TraitHandle {
                        canonical_name: canonical_name.clone(),
                        version: current_version,
                    });
                }
            }
        }

        self.last_registry_version = current_version;
    }

    fn build_snapshot(&mut self, now_epoch_ms: u64) -> WorldSnapshot {
        let entity_count = self.world.entities.alive_count() as u64;
        let total_energy: f64 =
            self.world.entities.iter().filter(|e| e.is_alive()).map(|e| e.energy).sum();
        let avg_energy = if entity_count == 0 { 0.0 } else { total_energy / entity_count as f64 };

        WorldSnapshot {
            tick: self.tick,
            entity_count,
            avg_energy,
            resource_count: self.world.environment.len() as u64,
            death_stats: self.world.take_death_stats(),
            timestamp_epoch_ms: now_epoch_ms,
        }
    }
}

#[cfg(test)]
#[path = "tick_tests.rs"]
mod tests;
