// SPDX-License-Identifier: MIT

//! Leaf error type for the bus crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("unknown channel: {0}")]
    UnknownChannel(String),

    #[error("bus receiver lagged and dropped messages")]
    Lagged,
}
