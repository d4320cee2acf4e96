// SPDX-License-Identifier: MIT

//! The LLM transport boundary (spec.md §4.8, §9 "the event boundary is
//! unchanged; only what crosses it differs"). `LlmClient` is the one trait
//! the Architect and Coder depend on; a real implementation is an HTTP
//! client with a timeout (spec.md §6 `llm_timeout_sec`) that this workspace
//! does not ship (out of scope, noted in DESIGN.md) — [`FakeLlmClient`]
//! under `test-support` is what exercises the pipeline in tests.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Compact world context embedded in both the plan and code prompts
/// (spec.md §4.7 "a compact world context").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldContext {
    pub entity_count: u64,
    pub avg_energy: f64,
    pub resource_count: u64,
    pub death_stats: HashMap<String, u64>,
}

/// Everything the Architect's problem-typed prompt is built from (spec.md
/// §4.8 "a problem-typed prompt built from the trigger").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRequest {
    pub problem_type: String,
    pub severity: String,
    pub affected_entities: u64,
    pub suggested_area: Option<String>,
    pub world_context: WorldContext,
}

/// The small JSON object the Architect asks the LLM for (spec.md §4.8
/// "{trait_name, description, action_type}").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResponse {
    pub trait_name: String,
    pub description: String,
    pub action_type: String,
}

impl PlanResponse {
    /// All three fields must be present and non-empty (spec.md §4.8
    /// "validate the response contains the required fields").
    pub fn is_complete(&self) -> bool {
        !self.trait_name.trim().is_empty()
            && !self.description.trim().is_empty()
            && !self.action_type.trim().is_empty()
    }
}

/// What the Coder asks the LLM to produce (spec.md §4.8 "a system prompt
/// that embeds the Entity API and safety rules"). `retry_guidance` is
/// `Some` only on the one allowed retry, carrying the prior validation
/// error (spec.md §4.8 "retries once with the specific validation error
/// embedded in the prompt as guidance").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeRequest {
    pub trait_name: String,
    pub description: String,
    pub action_type: String,
    pub retry_guidance: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeResponse {
    pub source: String,
}

#[derive(Debug, Error, Clone)]
pub enum LlmError {
    #[error("llm call timed out")]
    Timeout,
    #[error("llm transport error: {0}")]
    Transport(String),
    #[error("llm returned a malformed response: {0}")]
    MalformedResponse(String),
}

/// The transport boundary the Architect and Coder depend on. A real
/// implementation wraps an HTTP client and enforces `llm_timeout_sec`
/// (spec.md §6); this crate only depends on the trait.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn propose_plan(&self, request: PlanRequest) -> Result<PlanResponse, LlmError>;
    async fn generate_code(&self, request: CodeRequest) -> Result<CodeResponse, LlmError>;
}

/// Scripted [`LlmClient`] for tests: each call pops the next queued result,
/// returning [`LlmError::Transport`] once the queue runs dry so a test that
/// under-provisions responses fails loudly instead of hanging.
#[cfg(any(test, feature = "test-support"))]
pub struct FakeLlmClient {
    plans: parking_lot::Mutex<std::collections::VecDeque<Result<PlanResponse, LlmError>>>,
    code: parking_lot::Mutex<std::collections::VecDeque<Result<CodeResponse, LlmError>>>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeLlmClient {
    pub fn new() -> Self {
        Self {
            plans: parking_lot::Mutex::new(std::collections::VecDeque::new()),
            code: parking_lot::Mutex::new(std::collections::VecDeque::new()),
        }
    }

    pub fn queue_plan(&self, response: Result<PlanResponse, LlmError>) {
        self.plans.lock().push_back(response);
    }

    pub fn queue_code(&self, response: Result<CodeResponse, LlmError>) {
        self.code.lock().push_back(response);
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Default for FakeLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl LlmClient for FakeLlmClient {
    async fn propose_plan(&self, _request: PlanRequest) -> Result<PlanResponse, LlmError> {
        self.plans.lock().pop_front().unwrap_or_else(|| {
            Err(LlmError::Transport("FakeLlmClient: no plan response queued".to_string()))
        })
    }

    async fn generate_code(&self, _request: CodeRequest) -> Result<CodeResponse, LlmError> {
        self.code.lock().pop_front().unwrap_or_else(|| {
            Err(LlmError::Transport("FakeLlmClient: no code response queued".to_string()))
        })
    }
}

#[cfg(test)]
#[path = "llm_tests.rs"]
mod tests;
