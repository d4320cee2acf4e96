// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mp-bus: the typed, channel-keyed event bus (spec.md §2 "Event Bus", §6
//! channel table). `EventBus` is the trait every subsystem depends on;
//! [`BroadcastBus`] is the in-process `tokio::sync::broadcast`
//! implementation that backs it today. A Redis-backed implementation could
//! be dropped in at the same trait boundary without touching a publisher
//! or subscriber (noted as a deliberate non-goal in DESIGN.md).

mod error;

pub use error::BusError;

use std::collections::HashMap;
use std::sync::Arc;

use mp_core::Event;
use parking_lot::Mutex;
use tokio::sync::broadcast;

/// Default per-channel ring buffer capacity. Slow subscribers that fall
/// behind this many messages observe a `Lagged` error on their next recv
/// and must re-subscribe; this mirrors how a real pub/sub broker would
/// behave under consumer backpressure rather than silently blocking a
/// publisher (the tick engine's telemetry publish must never block).
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Publish/subscribe over the eight named channels in spec.md §6. Every
/// publish is fire-and-forget from the caller's perspective: if a channel
/// has no subscribers yet, the event is simply dropped, matching
/// `tokio::sync::broadcast` semantics and the spec's "publish-subscribe"
/// framing (there is no guaranteed-delivery requirement anywhere in §5).
pub trait EventBus: Send + Sync {
    /// Publish `event` on its own channel (`event.channel()`).
    fn publish(&self, event: Event) -> Result<(), BusError>;

    /// Subscribe to `channel` by name. Returns a fresh receiver that only
    /// observes events published after this call.
    fn subscribe(&self, channel: &str) -> broadcast::Receiver<Event>;
}

/// In-process implementation backed by one `tokio::sync::broadcast`
/// channel per named channel, created lazily on first publish or
/// subscribe.
pub struct BroadcastBus {
    channels: Mutex<HashMap<String, broadcast::Sender<Event>>>,
    capacity: usize,
}

impl BroadcastBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { channels: Mutex::new(HashMap::new()), capacity }
    }

    fn sender_for(&self, channel: &str) -> broadcast::Sender<Event> {
        let mut channels = self.channels.lock();
        channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }
}

impl Default for BroadcastBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus for BroadcastBus {
    fn publish(&self, event: Event) -> Result<(), BusError> {
        let sender = self.sender_for(event.channel());
        // A `SendError` here only means nobody is currently listening,
        // which is a normal, non-exceptional state for a pub/sub bus.
        let _ = sender.send(event);
        Ok(())
    }

    fn subscribe(&self, channel: &str) -> broadcast::Receiver<Event> {
        self.sender_for(channel).subscribe()
    }
}

/// Convenience wrapper so callers can hold `Arc<dyn EventBus>` while still
/// constructing a concrete default bus without importing `BroadcastBus`
/// directly, matching the teacher's `Arc<dyn Trait>`-at-the-seam style.
pub fn new_in_process_bus() -> Arc<dyn EventBus> {
    Arc::new(BroadcastBus::new())
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
