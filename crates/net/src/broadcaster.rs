// SPDX-License-Identifier: MIT

//! Fan-out of encoded world frames to connected WebSocket clients (spec.md
//! §4.1 step 7 "every 2nd tick, emit a compact binary world frame"). The
//! tick engine only depends on [`WorldBroadcaster`]; [`WebSocketBroadcaster`]
//! is the production implementation, [`FakeBroadcaster`] under
//! `test-support` records frames for assertions without opening a socket.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message;

use crate::error::NetError;

/// Broadcasts encoded world frames to every currently-connected consumer.
/// Implementations must not block the tick engine: a slow or absent
/// consumer should never delay the next tick.
pub trait WorldBroadcaster: Send + Sync {
    fn broadcast(&self, frame: Vec<u8>);
}

/// Accepts WebSocket connections and relays every frame handed to
/// [`broadcast`](WorldBroadcaster::broadcast) to each connected socket.
/// Connections that disconnect are dropped on their next failed write;
/// there is no reconnection or backfill (spec.md §6 defines the wire
/// format only, not a delivery guarantee).
pub struct WebSocketBroadcaster {
    sender: broadcast::Sender<Vec<u8>>,
}

impl WebSocketBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Bind a TCP listener and spawn the accept loop; each accepted
    /// connection gets its own relay task subscribed to this broadcaster.
    pub async fn serve(self: Arc<Self>, addr: SocketAddr) -> Result<(), NetError> {
        let listener = TcpListener::bind(addr).await.map_err(NetError::Bind)?;
        loop {
            let (stream, _) = listener.accept().await.map_err(NetError::Accept)?;
            let broadcaster = self.clone();
            tokio::spawn(async move {
                if let Err(err) = broadcaster.serve_connection(stream).await {
                    tracing::debug!(error = %err, "world frame connection closed");
                }
            });
        }
    }

    async fn serve_connection(&self, stream: TcpStream) -> Result<(), NetError> {
        let ws = tokio_tungstenite::accept_async(stream).await.map_err(NetError::Handshake)?;
        let (mut write, mut read) = ws.split();
        let mut rx = self.sender.subscribe();

        loop {
            tokio::select! {
                frame = rx.recv() => {
                    match frame {
                        Ok(bytes) => {
                            if write.send(Message::Binary(bytes)).await.is_err() {
                                return Ok(());
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => return Ok(()),
                    }
                }
                incoming = read.next() => {
                    match incoming {
                        Some(Ok(Message::Close(_))) | None => return Ok(()),
                        Some(Ok(_)) => continue,
                        Some(Err(_)) => return Ok(()),
                    }
                }
            }
        }
    }
}

impl WorldBroadcaster for WebSocketBroadcaster {
    fn broadcast(&self, frame: Vec<u8>) {
        // No subscribers is a normal idle state, not an error.
        let _ = self.sender.send(frame);
    }
}

/// Records every frame it's given, for assertions in tests that exercise
/// the tick engine's broadcast cadence without a real socket.
#[cfg(any(test, feature = "test-support"))]
pub struct FakeBroadcaster {
    frames: Mutex<Vec<Vec<u8>>>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeBroadcaster {
    pub fn new() -> Self {
        Self { frames: Mutex::new(Vec::new()) }
    }

    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.frames.lock().clone()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Default for FakeBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl WorldBroadcaster for FakeBroadcaster {
    fn broadcast(&self, frame: Vec<u8>) {
        self.frames.lock().push(frame);
    }
}

#[cfg(test)]
#[path = "broadcaster_tests.rs"]
mod tests;
