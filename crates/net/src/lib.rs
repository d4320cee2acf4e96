// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mp-net: the wire boundary (spec.md §6 "External interfaces") — the
//! binary world-frame codec, the WebSocket fan-out that broadcasts it, and
//! the thin API surface external collaborators use to fire manual triggers
//! and propose mutations. Everything that decides *what* happens to a
//! trigger or proposal lives in `mp-evolution`; this crate only shapes
//! bytes on and off the network.

pub mod broadcaster;
pub mod error;
pub mod frame;
pub mod trigger_api;

pub use broadcaster::{WebSocketBroadcaster, WorldBroadcaster};
pub use error::NetError;
pub use frame::encode_frame;
pub use trigger_api::{ManualTriggerRequest, TriggerApi};

#[cfg(any(test, feature = "test-support"))]
pub use broadcaster::FakeBroadcaster;
