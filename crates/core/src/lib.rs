// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mp-core: domain types shared across the workspace. Entities, ids,
//! canonical trait names, mutation and cycle records, the wire event
//! taxonomy, config, and the shared error type. Everything here is inert
//! data — no I/O, no async, no knowledge of the tick engine or the
//! evolution pipeline.

pub mod macros;

pub mod canonical;
pub mod clock;
pub mod config;
pub mod cycle;
pub mod entity;
pub mod error;
pub mod event;
pub mod id;
pub mod mutation;
pub mod snapshot;

pub use canonical::canonical;
pub use clock::{Clock, SystemClock};
#[cfg(any(test, feature = "test-support"))]
pub use clock::FakeClock;
pub use config::Config;
pub use cycle::{CycleId, CycleStage, EvolutionCycle, TriggerReason};
pub use entity::{
    DeathCause, Entity, EntityId, EntityKind, Infection, LifecycleState, Resource, ResourceId,
    TraitHandle,
};
pub use error::MorphicError;
pub use event::{
    Event, EvolutionPlanPayload, EvolutionTriggerPayload, EvolutionWorldContext, FeedPayload,
    MutationAppliedPayload, MutationFailedPayload, MutationReadyPayload, MutationRollbackPayload,
    TelemetryPayload,
};
pub use id::short;
pub use mutation::{FailureStage, MutationId, MutationRecord, MutationStatus, ReasonCode};
pub use snapshot::WorldSnapshot;
