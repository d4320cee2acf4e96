// SPDX-License-Identifier: MIT

//! Leaf error type for the evolution pipeline crate.

use thiserror::Error;

use mp_sim::traitlang::ScriptError;
use mp_storage::StorageError;

use crate::llm::LlmError;

#[derive(Debug, Error)]
pub enum EvolutionError {
    #[error("llm call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("validation failed: {0}")]
    Validation(#[from] ScriptError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("bus error: {0}")]
    Bus(#[from] mp_bus::BusError),

    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("illegal cycle stage transition: {0}")]
    IllegalCycleTransition(String),

    #[error("rate limit exceeded: {0}")]
    RateLimited(String),
}
