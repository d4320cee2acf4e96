// SPDX-License-Identifier: MIT

use thiserror::Error;

use mp_core::ReasonCode;

/// Failure producing, validating, or running a trait script.
#[derive(Debug, Error, Clone)]
pub enum ScriptError {
    #[error("syntax error: {0}")]
    Syntax(String),
    #[error("{reason}: {detail}")]
    Rejected { reason: ReasonCode, detail: String },
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("runtime error: {0}")]
    Runtime(String),
}

impl ScriptError {
    /// Map to the typed rejection code surfaced on mutation records
    /// (spec.md §4.5), for errors not already carrying one.
    pub fn reason_code(&self) -> ReasonCode {
        match self {
            ScriptError::Syntax(_) => ReasonCode::SyntaxError,
            ScriptError::Rejected { reason, .. } => *reason,
            ScriptError::Timeout(_) | ScriptError::Runtime(_) => ReasonCode::ExecutionFailed,
        }
    }
}
