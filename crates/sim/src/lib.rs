// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mp-sim: the simulation's moving parts — Entity Store, Environment
//! Store, physics, the trait-script language, the Trait Registry and
//! Executor, the World that binds them to spawn/regulator/growth logic,
//! and the Tick Engine that drives it all at a fixed cadence (spec.md §4).

pub mod consts;
pub mod entity_store;
pub mod environment_store;
pub mod error;
pub mod executor;
pub mod physics;
pub mod registry;
pub mod rng;
pub mod spatial;
pub mod tick;
pub mod traitlang;
pub mod world;

pub use entity_store::EntityStore;
pub use environment_store::EnvironmentStore;
pub use error::SimError;
pub use executor::Executor;
pub use registry::{Registry, RegistryEntry};
pub use rng::Rng;
pub use tick::{TickEngine, TickOutcome};
pub use world::World;
