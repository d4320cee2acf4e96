// SPDX-License-Identifier: MIT

//! Mutation records: persistent metadata for one proposed trait revision and
//! its lifecycle (spec.md §3 "Mutation record", invariants, §8 automaton).

use serde::{Deserialize, Serialize};

use crate::define_id;

define_id! {
    /// Opaque mutation identifier.
    pub struct MutationId("mut-");
}

/// Typed rejection reason codes from the Code Validator (spec.md §4.5),
/// surfaced to Gatekeeper callers and to `MutationRecord::failure_reason`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    SyntaxError,
    AstImportForbidden,
    AstBannedCall,
    AstBannedAttr,
    AstUnboundVariable,
    AstEntityAttrForbidden,
    AstInitRequiredArgs,
    AstAwaitOnSync,
    AstNoTraitClass,
    DuplicateCode,
    /// Module import succeeded at the AST level but the loader couldn't
    /// find the declared class, or raised while instantiating it.
    ImportFailed,
    /// `execute()` raised, timed out, or the static validator's sandbox
    /// otherwise rejected it at load time.
    ExecutionFailed,
}

crate::simple_display! {
    ReasonCode {
        SyntaxError => "SYNTAX_ERROR",
        AstImportForbidden => "AST_IMPORT_FORBIDDEN",
        AstBannedCall => "AST_BANNED_CALL",
        AstBannedAttr => "AST_BANNED_ATTR",
        AstUnboundVariable => "AST_UNBOUND_VARIABLE",
        AstEntityAttrForbidden => "AST_ENTITY_ATTR_FORBIDDEN",
        AstInitRequiredArgs => "AST_INIT_REQUIRED_ARGS",
        AstAwaitOnSync => "AST_AWAIT_ON_SYNC",
        AstNoTraitClass => "AST_NO_TRAIT_CLASS",
        DuplicateCode => "DUPLICATE_CODE",
        ImportFailed => "IMPORT_FAILED",
        ExecutionFailed => "EXECUTION_FAILED",
    }
}

/// Where a Patcher-stage failure occurred (spec.md §4.9 Mutation Failed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Validation,
    Import,
    Execution,
}

crate::simple_display! {
    FailureStage {
        Validation => "validation",
        Import => "import",
        Execution => "execution",
    }
}

/// Lifecycle status of a mutation record. Transitions are monotonic
/// (spec.md §3 invariants): `queued -> validating -> (sandbox_ok ->
/// activated) | rejected`; `activated -> rolled_back` is allowed, nothing
/// else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationStatus {
    Queued,
    Validating,
    SandboxOk,
    Activated,
    Rejected,
    RolledBack,
    Failed,
}

crate::simple_display! {
    MutationStatus {
        Queued => "queued",
        Validating => "validating",
        SandboxOk => "sandbox_ok",
        Activated => "activated",
        Rejected => "rejected",
        RolledBack => "rolled_back",
        Failed => "failed",
    }
}

impl MutationStatus {
    /// Is `next` a legal transition from `self`?
    pub fn can_transition_to(self, next: MutationStatus) -> bool {
        use MutationStatus::*;
        matches!(
            (self, next),
            (Queued, Validating)
                | (Validating, SandboxOk)
                | (Validating, Rejected)
                | (Validating, Failed)
                | (SandboxOk, Activated)
                | (SandboxOk, Failed)
                | (Activated, RolledBack)
        )
    }
}

/// Persistent metadata for one proposed trait revision (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationRecord {
    pub mutation_id: MutationId,
    pub plan_id: String,
    pub cycle_id: String,
    pub trait_name: String,
    pub version: u64,
    pub source_hash: String,
    pub file_path: String,
    pub status: MutationStatus,
    pub failure_reason: Option<ReasonCode>,
    pub validation_log: Vec<String>,
}

impl MutationRecord {
    /// Advance `status`, enforcing the monotonic automaton. Returns an error
    /// describing the illegal transition instead of panicking; callers
    /// decide how to surface it (the registry/patcher treat it as a bug).
    pub fn transition(&mut self, next: MutationStatus) -> Result<(), String> {
        if !self.status.can_transition_to(next) {
            return Err(format!(
                "illegal mutation status transition: {} -> {next}",
                self.status
            ));
        }
        self.status = next;
        Ok(())
    }
}

#[cfg(test)]
#[path = "mutation_tests.rs"]
mod tests;
