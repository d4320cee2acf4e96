// SPDX-License-Identifier: MIT

//! Shared fixtures for the end-to-end evolution-pipeline scenarios below.
//! Each scenario wires a real in-process [`mp_bus::BroadcastBus`] and a
//! real (in-memory) [`mp_storage`] durable store the way `morphicd` wires
//! them, then drives the five pipeline agents through their directly-
//! callable handler methods instead of racing their long-lived `run()`
//! loops — deterministic, and closer to what these scenarios are actually
//! asserting about than a process-spawning harness would be.

use std::sync::Arc;

use mp_bus::{new_in_process_bus, EventBus};
use mp_core::Config;
use mp_storage::{CycleStore, InMemoryDurableStore, MutationStore};

/// A minimal trait script that passes every validator check (spec.md
/// §4.5): imports nothing, inherits `BaseTrait`, and its `execute` only
/// calls a whitelisted entity method.
pub const VALID_TRAIT_SOURCE_V1: &str =
    "class EnergySaverTrait(BaseTrait):\n    async def execute(self, entity):\n        entity.move(1.0, 0.0)\n";

/// A second, textually distinct version of the same trait family, for
/// scenarios that exercise an in-place version upgrade.
pub const VALID_TRAIT_SOURCE_V2: &str =
    "class EnergySaverTrait(BaseTrait):\n    async def execute(self, entity):\n        entity.move(0.0, 1.0)\n";

pub fn config() -> Config {
    Config { min_population: 20, max_entities: 500, evolution_cooldown_sec: 60, ..Config::default() }
}

/// The storage and bus collaborators every scenario needs, minus the
/// agents themselves (each scenario constructs only the agents its
/// pipeline slice actually exercises).
pub struct Fixture {
    pub bus: Arc<dyn EventBus>,
    pub cycle_store: Arc<CycleStore>,
    pub mutation_store: Arc<MutationStore>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            bus: new_in_process_bus(),
            cycle_store: Arc::new(CycleStore::new(Arc::new(InMemoryDurableStore::new()))),
            mutation_store: Arc::new(MutationStore::new(Arc::new(InMemoryDurableStore::new()))),
        }
    }
}
