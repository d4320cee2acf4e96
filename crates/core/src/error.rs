// SPDX-License-Identifier: MIT

//! The shared error type threaded through every crate in the workspace.

use thiserror::Error;

/// Errors surfaced by domain-level operations in `mp-core`. Subsystem
/// crates define their own leaf error enums and convert into this one at
/// their public boundary, mirroring how `mp-core` itself stays a thin,
/// dependency-free layer beneath everything else.
#[derive(Debug, Error)]
pub enum MorphicError {
    #[error("invalid config value for {key}: {value:?}")]
    InvalidConfig { key: &'static str, value: String },

    #[error("illegal state transition: {0}")]
    IllegalTransition(String),

    #[error("{0}")]
    Other(String),
}

impl From<String> for MorphicError {
    fn from(message: String) -> Self {
        MorphicError::Other(message)
    }
}
