// SPDX-License-Identifier: MIT

//! Leaf error type for the wire boundary crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetError {
    #[error("failed to bind world frame listener: {0}")]
    Bind(#[source] std::io::Error),

    #[error("failed to accept world frame connection: {0}")]
    Accept(#[source] std::io::Error),

    #[error("websocket handshake failed: {0}")]
    Handshake(#[source] tokio_tungstenite::tungstenite::Error),

    #[error("manual trigger rejected: {0}")]
    InvalidTrigger(String),

    #[error(transparent)]
    Gatekeeper(#[from] mp_evolution::GatekeeperError),

    #[error(transparent)]
    Bus(#[from] mp_bus::BusError),
}
