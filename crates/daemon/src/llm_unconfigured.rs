// SPDX-License-Identifier: MIT

//! The default [`LlmClient`] `morphicd` wires in until an operator supplies
//! a real one. A concrete HTTP-backed client is out of scope for this
//! workspace (noted in the repository's design ledger); this type exists
//! so the Architect and Coder always have something to call, and fails
//! loudly instead of the daemon refusing to start.

use async_trait::async_trait;
use mp_evolution::{CodeRequest, CodeResponse, LlmClient, LlmError, PlanRequest, PlanResponse};

pub struct UnconfiguredLlmClient;

#[async_trait]
impl LlmClient for UnconfiguredLlmClient {
    async fn propose_plan(&self, _request: PlanRequest) -> Result<PlanResponse, LlmError> {
        Err(LlmError::Transport("no llm client configured for this daemon".to_string()))
    }

    async fn generate_code(&self, _request: CodeRequest) -> Result<CodeResponse, LlmError> {
        Err(LlmError::Transport("no llm client configured for this daemon".to_string()))
    }
}
