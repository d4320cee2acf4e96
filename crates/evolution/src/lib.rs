// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mp-evolution: the five-stage Evolution Control Pipeline (spec.md §4.7-
//! §4.10) — Watcher, Architect, Coder, Patcher, and Gatekeeper — serialized
//! by the cross-process cycle mutex in `mp-storage` and wired together
//! entirely through the `mp-bus` event bus. Every component here reacts to
//! events; none of them poll each other directly.

pub mod anomaly;
pub mod architect;
pub mod coder;
pub mod error;
pub mod gatekeeper;
pub mod llm;
pub mod patcher;
pub mod watcher;

pub use anomaly::{ProblemType, Severity, TYPICAL_MAX_ENERGY};
pub use architect::Architect;
pub use coder::Coder;
pub use error::EvolutionError;
pub use gatekeeper::{Gatekeeper, GatekeeperError, MutationProposal};
pub use llm::{CodeRequest, CodeResponse, LlmClient, LlmError, PlanRequest, PlanResponse, WorldContext};
pub use patcher::Patcher;
pub use watcher::Watcher;

#[cfg(any(test, feature = "test-support"))]
pub use llm::FakeLlmClient;
