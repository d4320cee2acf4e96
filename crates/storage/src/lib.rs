// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mp-storage: the out-of-core cache and durable store behind the mutation
//! record, world-snapshot cache, cycle lock/record, and checkpoint blobs
//! (spec.md §6). Two families of backend, each behind a trait so the rest
//! of the workspace never depends on a concrete implementation: an
//! in-memory one for tests and ephemeral runs, and a filesystem-backed one
//! (JSON files with a TTL sidecar) for a real `morphicd` process.

pub mod cache;
pub mod checkpoint;
pub mod cycle_store;
pub mod durable;
pub mod error;
pub mod mutation_store;

pub use cache::{Cache, FsCache, InMemoryCache};
pub use checkpoint::{Checkpoint, CheckpointEntitySnapshot, CheckpointStore};
pub use cycle_store::{CycleLockRecord, CycleStore};
pub use durable::{DurableStore, FsDurableStore, InMemoryDurableStore};
pub use error::StorageError;
pub use mutation_store::MutationStore;
