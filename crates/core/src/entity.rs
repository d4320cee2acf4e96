// SPDX-License-Identifier: MIT

//! The entity data model (spec.md §3 "Entity").

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::define_id;

define_id! {
    /// Opaque entity identifier.
    pub struct EntityId("ent-");
}

define_id! {
    /// Opaque resource identifier.
    pub struct ResourceId("res-");
}

/// Molbots are prey; predators hunt them. Both share the entity data model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Molbot,
    Predator,
}

crate::simple_display! {
    EntityKind {
        Molbot => "molbot",
        Predator => "predator",
    }
}

/// An entity's place in the lifecycle state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Alive,
    Dead,
    Reproducing,
}

crate::simple_display! {
    LifecycleState {
        Alive => "alive",
        Dead => "dead",
        Reproducing => "reproducing",
    }
}

/// Why an entity died, for death-stats attribution (spec.md §4.1 step 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathCause {
    PredatorKill,
    VirusKill,
    Starvation,
    OldAge,
}

crate::simple_display! {
    DeathCause {
        PredatorKill => "predator_kill",
        VirusKill => "virus_kill",
        Starvation => "starvation",
        OldAge => "old_age",
    }
}

/// Infection status: whether an entity is currently carrying the virus and,
/// if so, how many ticks remain until it recovers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Infection {
    pub infected: bool,
    pub recovery_ticks_remaining: u32,
}

impl Infection {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn ignite(recovery_ticks: u32) -> Self {
        Self {
            infected: true,
            recovery_ticks_remaining: recovery_ticks,
        }
    }

    /// Advance the recovery timer by one tick; returns true if recovery just completed.
    pub fn tick(&mut self) -> bool {
        if !self.infected {
            return false;
        }
        if self.recovery_ticks_remaining > 0 {
            self.recovery_ticks_remaining -= 1;
        }
        if self.recovery_ticks_remaining == 0 {
            self.infected = false;
            return true;
        }
        false
    }
}

/// One active trait instance attached to an entity.
///
/// The simulation crate owns the runnable trait object; this is the
/// bookkeeping record the core data model exposes for invariant checks
/// (trait-list length, deactivation) without depending on the interpreter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraitHandle {
    /// Canonical family name (registry key).
    pub canonical_name: String,
    /// Registry version this instance was created from.
    pub version: u64,
}

/// A single entity (molbot or predator) in the simulation (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    // Identity
    pub id: EntityId,
    pub generation: u32,
    pub parent_id: Option<EntityId>,
    pub born_at_tick: u64,
    pub dna_fingerprint: u64,

    // Physical state
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub energy: f64,
    pub max_energy: f64,
    pub metabolism_rate: f64,
    /// 0 means immortal.
    pub max_age: u64,
    pub age: u64,

    // Lifecycle
    pub state: LifecycleState,
    pub kind: EntityKind,
    pub infection: Infection,

    // Behavior
    pub traits: Vec<TraitHandle>,
    pub deactivated_traits: HashSet<String>,

    /// Energy gained this tick via legitimate `eat_nearby` calls, tracked
    /// separately so the tick engine can sandbox trait execution (spec.md
    /// §4.1 step 1): only this much energy is allowed to persist across the
    /// trait-execution phase of a tick, capped at `max_energy`.
    #[serde(skip)]
    pub trait_energy_gain: f64,
}

impl Entity {
    pub fn is_alive(&self) -> bool {
        self.state == LifecycleState::Alive
    }

    pub fn deactivate_trait(&mut self, canonical_name: &str) {
        self.deactivated_traits.insert(canonical_name.to_string());
    }

    pub fn activate_trait(&mut self, canonical_name: &str) {
        self.deactivated_traits.remove(canonical_name);
    }

    pub fn is_trait_deactivated(&self, canonical_name: &str) -> bool {
        self.deactivated_traits.contains(canonical_name)
    }

    /// Receive energy from a legitimate resource consumption. Capped at
    /// `max_energy` and tallied into `trait_energy_gain` so the per-tick
    /// sandbox in the tick engine can tell real gains from fabricated ones.
    pub fn receive_energy(&mut self, amount: f64) {
        let amount = amount.max(0.0);
        self.trait_energy_gain += amount;
        self.energy = (self.energy + amount).min(self.max_energy);
    }
}

/// A resource (food) point in the environment (spec.md §3 "Resource").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub x: f64,
    pub y: f64,
    pub energy: f64,
    pub kind: String,
}

#[cfg(test)]
#[path = "entity_tests.rs"]
mod tests;
