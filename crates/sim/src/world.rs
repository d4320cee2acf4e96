// SPDX-License-Identifier: MIT

//! World: the non-store pieces of the tick loop that spawn, regulate, and
//! grow the population (spec.md §4.1 steps 3-5, 8-9). The Entity Store and
//! Environment Store remain the keyed collections; this module is what
//! decides *when* something is spawned, killed, or infected.

use std::collections::{HashMap, HashSet};

use sha2::{Digest, Sha256};

use mp_core::{
    Config, DeathCause, Entity, EntityId, EntityKind, Infection, LifecycleState, Resource,
    ResourceId,
};

use crate::consts::{
    INITIAL_RESOURCES, MAX_MOVE_PER_TICK, MAX_PREDATORS, ORGANIC_GROWTH_HIGH_ENERGY_RATIO,
    ORGANIC_GROWTH_VERY_HIGH_ENERGY_RATIO, PREDATOR_HUNT_RADIUS, RESOURCE_ENERGY,
    SPAWN_BATCH, VIRUS_DRAIN_RATE, VIRUS_IGNITION_PROBABILITY, VIRUS_INFECTION_PROBABILITY,
    VIRUS_INFECTION_RADIUS, VIRUS_RECOVERY_TICKS,
};
use crate::entity_store::EntityStore;
use crate::environment_store::EnvironmentStore;
use crate::rng::Rng;

const MOLBOT_RADIUS: f64 = 10.0;
const MOLBOT_MAX_ENERGY: f64 = 100.0;
const MOLBOT_SPAWN_ENERGY: f64 = 100.0;
const MOLBOT_METABOLISM_RATE: f64 = 1.0;
const MOLBOT_MAX_AGE: u64 = 0;

const PREDATOR_RADIUS: f64 = 15.0;
const PREDATOR_MAX_ENERGY: f64 = 200.0;
const PREDATOR_SPAWN_ENERGY: f64 = 200.0;
const PREDATOR_METABOLISM_RATE: f64 = 2.5;
const PREDATOR_MAX_AGE: u64 = 8000;

fn dna_fingerprint(id: &EntityId) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(id.as_str().as_bytes());
    let digest = hasher.finalize();
    u64::from_be_bytes(digest[0..8].try_into().unwrap_or([0; 8]))
}

/// Per-entity aging, metabolism, and infection drain (spec.md §4.1 step 1,
/// the part that runs before and after trait execution rather than
/// through it). Returns the cause if this call killed the entity.
pub fn apply_aging_and_metabolism(entity: &mut Entity) -> Option<DeathCause> {
    entity.age += 1;
    if entity.max_age > 0 && entity.age >= entity.max_age {
        entity.state = LifecycleState::Dead;
        return Some(DeathCause::OldAge);
    }

    let was_infected = entity.infection.infected;
    entity.energy -= entity.metabolism_rate;
    if was_infected {
        entity.energy -= VIRUS_DRAIN_RATE;
        entity.infection.tick();
    }

    if entity.energy <= 0.0 {
        entity.state = LifecycleState::Dead;
        return Some(if was_infected { DeathCause::VirusKill } else { DeathCause::Starvation });
    }

    None
}

/// Binds the Entity Store and Environment Store to spawn logic, the
/// predator and virus regulators, organic growth, and resource respawn.
/// Owned exclusively by the Tick Engine (spec.md §5 "Shared-resource
/// policy").
pub struct World {
    pub entities: EntityStore,
    pub environment: EnvironmentStore,
    pub rng: Rng,

    /// Death counters since the last telemetry reset (spec.md §4.1 step 10).
    pub death_stats: HashMap<DeathCause, u64>,
    /// Cumulative, never reset: how many molbots predators have eaten.
    pub predator_kills: u64,
    /// Cumulative, never reset: how many deaths were attributed to the virus.
    pub virus_kills: u64,
    /// Cumulative, never reset: how many predators have died, of any cause.
    pub predator_deaths: u64,

    pending_death_causes: HashMap<EntityId, DeathCause>,
    virus_active: bool,
}

impl World {
    pub fn new(rng: Rng) -> Self {
        Self {
            entities: EntityStore::new(),
            environment: EnvironmentStore::new(),
            rng,
            death_stats: HashMap::new(),
            predator_kills: 0,
            virus_kills: 0,
            predator_deaths: 0,
            pending_death_causes: HashMap::new(),
            virus_active: false,
        }
    }

    /// Whether the virus regulator currently has an active outbreak.
    pub fn virus_active(&self) -> bool {
        self.virus_active
    }

    /// Seed a fresh world with `min_population` molbots and the initial
    /// resource field. A no-op contribution to population count if called
    /// more than once; callers only do this on a cold start (spec.md §4.10
    /// "Absence of a checkpoint is a fresh start").
    pub fn seed(&mut self, cfg: &Config) {
        for _ in 0..cfg.min_population {
            let (x, y) = self.random_position(cfg.world_width, cfg.world_height);
            self.spawn_molbot_at(x, y, 0);
        }
        for _ in 0..INITIAL_RESOURCES {
            self.spawn_resource(cfg.world_width, cfg.world_height);
        }
        self.entities.rebuild_index();
        self.environment.rebuild_index();
    }

    fn random_position(&mut self, width: f64, height: f64) -> (f64, f64) {
        (self.rng.uniform(0.0, width), self.rng.uniform(0.0, height))
    }

    pub fn spawn_molbot_at(&mut self, x: f64, y: f64, tick: u64) -> EntityId {
        let id = EntityId::new();
        let entity = Entity {
            id,
            generation: 0,
            parent_id: None,
            born_at_tick: tick,
            dna_fingerprint: dna_fingerprint(&id),
            x,
            y,
            radius: MOLBOT_RADIUS,
            energy: MOLBOT_SPAWN_ENERGY,
            max_energy: MOLBOT_MAX_ENERGY,
            metabolism_rate: MOLBOT_METABOLISM_RATE,
            max_age: MOLBOT_MAX_AGE,
            age: 0,
            state: LifecycleState::Alive,
            kind: EntityKind::Molbot,
            infection: Infection::none(),
            traits: Vec::new(),
            deactivated_traits: HashSet::new(),
            trait_energy_gain: 0.0,
        };
        self.entities.insert(entity);
        id
    }

    pub fn spawn_predator_at(&mut self, x: f64, y: f64, tick: u64) -> EntityId {
        let id = EntityId::new();
        let entity = Entity {
            id,
            generation: 0,
            parent_id: None,
            born_at_tick: tick,
            dna_fingerprint: dna_fingerprint(&id),
            x,
            y,
            radius: PREDATOR_RADIUS,
            energy: PREDATOR_SPAWN_ENERGY,
            max_energy: PREDATOR_MAX_ENERGY,
            metabolism_rate: PREDATOR_METABOLISM_RATE,
            max_age: PREDATOR_MAX_AGE,
            age: 0,
            state: LifecycleState::Alive,
            kind: EntityKind::Predator,
            infection: Infection::none(),
            traits: Vec::new(),
            deactivated_traits: HashSet::new(),
            trait_energy_gain: 0.0,
        };
        self.entities.insert(entity);
        id
    }

    /// Reconstruct one entity from a checkpoint's restorable fields
    /// (spec.md §4.10). Physical constants not carried by the checkpoint
    /// (radius, metabolism rate, max age) are re-derived from `kind`, the
    /// same as a fresh spawn; `traits` starts empty and is repopulated by
    /// the next registry-upgrade pass rather than replayed here.
    pub fn restore_entity(
        &mut self,
        id: EntityId,
        x: f64,
        y: f64,
        energy: f64,
        max_energy: f64,
        age: u64,
        kind: EntityKind,
        state: LifecycleState,
        parent_id: Option<EntityId>,
        checkpoint_tick: u64,
    ) {
        let (radius, metabolism_rate, max_age) = match kind {
            EntityKind::Molbot => (MOLBOT_RADIUS, MOLBOT_METABOLISM_RATE, MOLBOT_MAX_AGE),
            EntityKind::Predator => (PREDATOR_RADIUS, PREDATOR_METABOLISM_RATE, PREDATOR_MAX_AGE),
        };
        let entity = Entity {
            id,
            generation: 0,
            parent_id,
            born_at_tick: checkpoint_tick.saturating_sub(age),
            dna_fingerprint: dna_fingerprint(&id),
            x,
            y,
            radius,
            energy,
            max_energy,
            metabolism_rate,
            max_age,
            age,
            state,
            kind,
            infection: Infection::none(),
            traits: Vec::new(),
            deactivated_traits: HashSet::new(),
            trait_energy_gain: 0.0,
        };
        self.entities.insert(entity);
    }

    fn spawn_resource(&mut self, width: f64, height: f64) {
        let (x, y) = self.random_position(width, height);
        self.environment.insert(Resource {
            id: ResourceId::new(),
            x,
            y,
            energy: RESOURCE_ENERGY,
            kind: "food".to_string(),
        });
    }

    /// Record that `id` died of `cause`. Idempotent: a second call before
    /// `reap` just overwrites the recorded cause.
    pub fn mark_dead(&mut self, id: EntityId, cause: DeathCause) {
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.state = LifecycleState::Dead;
        }
        self.pending_death_causes.insert(id, cause);
    }

    /// Lifecycle reap (spec.md §4.1 step 3): remove every entity in state
    /// `dead`, attributing its cause to `death_stats` and the cumulative
    /// counters. Returns the number of entities reaped.
    pub fn reap(&mut self) -> u32 {
        let dead_ids: Vec<EntityId> = self
            .entities
            .iter()
            .filter(|e| e.state == LifecycleState::Dead)
            .map(|e| e.id)
            .collect();

        let mut reaped = 0;
        for id in dead_ids {
            let cause = self.pending_death_causes.remove(&id).unwrap_or(DeathCause::Starvation);
            if let Some(entity) = self.entities.remove(&id) {
                *self.death_stats.entry(cause).or_insert(0) += 1;
                if entity.kind == EntityKind::Predator {
                    self.predator_deaths += 1;
                }
                if cause == DeathCause::VirusKill {
                    self.virus_kills += 1;
                }
                reaped += 1;
            }
        }
        reaped
    }

    /// Predator regulator (spec.md §4.1 step 4). Spawns a fresh predator
    /// when the molbot population outgrows the configured threshold and the
    /// live predator count is under the cap, then lets every live predator
    /// close on its nearest molbot and consume it on contact.
    pub fn predator_regulator(&mut self, cfg: &Config, tick: u64) {
        let molbot_count = self.count_alive(EntityKind::Molbot);
        let predator_count = self.count_alive(EntityKind::Predator);

        if molbot_count > cfg.predator_spawn_threshold && predator_count < MAX_PREDATORS {
            let (x, y) = self.random_position(cfg.world_width, cfg.world_height);
            self.spawn_predator_at(x, y, tick);
        }

        let predator_ids: Vec<EntityId> = self
            .entities
            .iter()
            .filter(|e| e.is_alive() && e.kind == EntityKind::Predator)
            .map(|e| e.id)
            .collect();

        for predator_id in predator_ids {
            self.hunt(predator_id);
        }
    }

    /// One predator's hunt step: find the nearest molbot in range, close the
    /// distance by up to `MAX_MOVE_PER_TICK`, and consume it on contact.
    fn hunt(&mut self, predator_id: EntityId) {
        let Some((px, py, predator_radius)) =
            self.entities.get(&predator_id).map(|e| (e.x, e.y, e.radius))
        else {
            return;
        };

        let target = self
            .entities
            .nearby(px, py, PREDATOR_HUNT_RADIUS)
            .into_iter()
            .filter(|e| e.kind == EntityKind::Molbot)
            .min_by(|a, b| {
                let da = (a.x - px).powi(2) + (a.y - py).powi(2);
                let db = (b.x - px).powi(2) + (b.y - py).powi(2);
                da.total_cmp(&db)
            })
            .map(|e| (e.id, e.x, e.y, e.radius, e.energy));

        let Some((prey_id, tx, ty, prey_radius, prey_energy)) = target else {
            return;
        };

        let dx = tx - px;
        let dy = ty - py;
        let dist = (dx * dx + dy * dy).sqrt();
        let (mx, my) = if dist > MAX_MOVE_PER_TICK && dist > f64::EPSILON {
            let scale = MAX_MOVE_PER_TICK / dist;
            (dx * scale, dy * scale)
        } else {
            (dx, dy)
        };

        if let Some(predator) = self.entities.get_mut(&predator_id) {
            predator.x += mx;
            predator.y += my;
        }

        let remaining = (dist - MAX_MOVE_PER_TICK).max(0.0);
        if remaining <= predator_radius + prey_radius {
            if let Some(predator) = self.entities.get_mut(&predator_id) {
                predator.receive_energy(prey_energy);
            }
            self.mark_dead(prey_id, DeathCause::PredatorKill);
            self.predator_kills += 1;
        }
    }

    /// Virus regulator (spec.md §4.1 step 5). While dormant, has a small
    /// per-tick chance to ignite once the molbot population outgrows the
    /// configured threshold. While active, every infected entity attempts
    /// to infect nearby molbots; the outbreak ends once nothing remains
    /// infected.
    pub fn virus_regulator(&mut self, cfg: &Config) {
        if !self.virus_active {
            let molbot_count = self.count_alive(EntityKind::Molbot);
            if molbot_count > cfg.virus_spawn_threshold && self.rng.chance(VIRUS_IGNITION_PROBABILITY) {
                self.ignite_one();
            }
            return;
        }

        let infected_ids: Vec<EntityId> = self
            .entities
            .iter()
            .filter(|e| e.is_alive() && e.infection.infected)
            .map(|e| e.id)
            .collect();

        for id in &infected_ids {
            self.spread_from(*id);
        }

        let any_infected = self.entities.iter().any(|e| e.is_alive() && e.infection.infected);
        if !any_infected {
            self.virus_active = false;
        }
    }

    fn ignite_one(&mut self) {
        let candidates: Vec<EntityId> = self
            .entities
            .iter()
            .filter(|e| e.is_alive() && e.kind == EntityKind::Molbot && !e.infection.infected)
            .map(|e| e.id)
            .collect();
        if candidates.is_empty() {
            return;
        }
        let idx = self.rng.range_i64(0, candidates.len() as i64) as usize;
        let chosen = candidates[idx];
        if let Some(entity) = self.entities.get_mut(&chosen) {
            entity.infection = Infection::ignite(VIRUS_RECOVERY_TICKS);
        }
        self.virus_active = true;
    }

    fn spread_from(&mut self, source_id: EntityId) {
        let Some((x, y)) = self.entities.get(&source_id).map(|e| (e.x, e.y)) else {
            return;
        };

        let neighbor_ids: Vec<EntityId> = self
            .entities
            .nearby(x, y, VIRUS_INFECTION_RADIUS)
            .into_iter()
            .filter(|e| e.kind == EntityKind::Molbot && !e.infection.infected && e.id != source_id)
            .map(|e| e.id)
            .collect();

        for id in neighbor_ids {
            if self.rng.chance(VIRUS_INFECTION_PROBABILITY) {
                if let Some(entity) = self.entities.get_mut(&id) {
                    entity.infection = Infection::ignite(VIRUS_RECOVERY_TICKS);
                }
            }
        }
    }

    /// Organic growth (spec.md §4.1 step 8): top up under `min_population`,
    /// otherwise spawn a little more while average energy is healthy,
    /// always bounded by `max_entities`.
    pub fn organic_growth(&mut self, cfg: &Config, tick: u64) {
        let alive_molbots = self.count_alive(EntityKind::Molbot);
        let wanted = if alive_molbots < cfg.min_population {
            SPAWN_BATCH.min(cfg.min_population - alive_molbots)
        } else {
            let ratio = self.average_energy_ratio();
            if ratio >= ORGANIC_GROWTH_VERY_HIGH_ENERGY_RATIO {
                2
            } else if ratio >= ORGANIC_GROWTH_HIGH_ENERGY_RATIO {
                1
            } else {
                0
            }
        };

        let total_alive = self.entities.alive_count() as u32;
        let room = cfg.max_entities.saturating_sub(total_alive);
        let to_spawn = wanted.min(room);

        for _ in 0..to_spawn {
            let (x, y) = self.random_position(cfg.world_width, cfg.world_height);
            self.spawn_molbot_at(x, y, tick);
        }
    }

    fn average_energy_ratio(&self) -> f64 {
        let mut total = 0.0;
        let mut count = 0u32;
        for entity in self.entities.iter().filter(|e| e.is_alive()) {
            if entity.max_energy > 0.0 {
                total += entity.energy / entity.max_energy;
                count += 1;
            }
        }
        if count == 0 {
            0.0
        } else {
            total / count as f64
        }
    }

    /// Resource respawn (spec.md §4.1 step 9): fractional rates spawn
    /// probabilistically so e.g. a rate of 0.5 spawns one resource every
    /// other tick on average.
    pub fn resource_respawn(&mut self, rate: f64, world_width: f64, world_height: f64) {
        let whole = rate.trunc().max(0.0) as u32;
        let fractional = rate - whole as f64;

        for _ in 0..whole {
            self.spawn_resource(world_width, world_height);
        }
        if fractional > 0.0 && self.rng.chance(fractional) {
            self.spawn_resource(world_width, world_height);
        }
    }

    fn count_alive(&self, kind: EntityKind) -> u32 {
        self.entities.iter().filter(|e| e.is_alive() && e.kind == kind).count() as u32
    }

    /// Drain and return the death-stats map, resetting it to empty (spec.md
    /// §4.1 step 10 "reset death counters").
    pub fn take_death_stats(&mut self) -> HashMap<DeathCause, u64> {
        std::mem::take(&mut self.death_stats)
    }
}

#[cfg(test)]
#[path = "world_tests.rs"]
mod tests;
