// SPDX-License-Identifier: MIT

//! Leaf error type for the simulation crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    #[error("unknown trait family: {0}")]
    UnknownTrait(String),

    #[error("trait list at capacity ({max})")]
    TraitListFull { max: u32 },

    #[error("script error: {0}")]
    Script(#[from] crate::traitlang::ScriptError),
}
