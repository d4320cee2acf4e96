// SPDX-License-Identifier: MIT

//! The Coder (spec.md §4.8 steps 6-9): turns an Evolution Plan into
//! validated trait-script source, writing it to the mutations directory
//! and handing it to the Patcher as a Mutation Ready event. Allowed one
//! retry with the validator's rejection embedded as guidance (spec.md §4.8
//! "retries once with the specific validation error embedded in the
//! prompt").

use std::collections::HashMap;
use std::sync::Arc;

use mp_core::{
    Event, EvolutionPlanPayload, FailureStage, FeedPayload, MutationFailedPayload, MutationId,
    MutationReadyPayload, MutationRecord, MutationStatus, ReasonCode,
};
use mp_bus::EventBus;
use mp_storage::MutationStore;
use parking_lot::Mutex;

use crate::error::EvolutionError;
use crate::llm::{CodeRequest, LlmClient};

const FEED_SOURCE: &str = "coder";

pub struct Coder {
    bus: Arc<dyn EventBus>,
    mutation_store: Arc<MutationStore>,
    llm: Arc<dyn LlmClient>,
    mutations_dir: String,
    versions: Mutex<HashMap<String, u64>>,
}

impl Coder {
    pub fn new(
        bus: Arc<dyn EventBus>,
        mutation_store: Arc<MutationStore>,
        llm: Arc<dyn LlmClient>,
        mutations_dir: String,
    ) -> Self {
        Self { bus, mutation_store, llm, mutations_dir, versions: Mutex::new(HashMap::new()) }
    }

    /// Handle one Evolution Plan (spec.md §4.8 steps 6-9).
    pub async fn on_plan(&self, plan: &EvolutionPlanPayload) -> Result<(), EvolutionError> {
        self.publish_feed(&format!("cycle {} coding: {}", plan.cycle_id, plan.target_class));

        let is_hash_used = |hash: &str| self.mutation_store.is_hash_used(hash).unwrap_or(false);

        let first_request = CodeRequest {
            trait_name: plan.target_class.clone(),
            description: plan.description.clone(),
            action_type: plan.action_type.clone(),
            retry_guidance: None,
        };

        let source = match self.llm.generate_code(first_request.clone()).await {
            Ok(response) => response.source,
            Err(err) => {
                self.fail(plan, ReasonCode::ExecutionFailed, FailureStage::Validation, &format!("llm call failed: {err}"));
                return Ok(());
            }
        };

        let validated = match mp_sim::traitlang::validate(&source, &is_hash_used) {
            Ok(validated) => validated,
            Err(first_error) => {
                let retry_request = CodeRequest { retry_guidance: Some(first_error.to_string()), ..first_request };
                let retry_source = match self.llm.generate_code(retry_request).await {
                    Ok(response) => response.source,
                    Err(err) => {
                        self.fail(plan, ReasonCode::ExecutionFailed, FailureStage::Validation, &format!("llm retry failed: {err}"));
                        return Ok(());
                    }
                };
                match mp_sim::traitlang::validate(&retry_source, &is_hash_used) {
                    Ok(validated) => validated,
                    Err(second_error) => {
                        self.fail(plan, second_error.reason_code(), FailureStage::Validation, &second_error.to_string());
                        return Ok(());
                    }
                }
            }
        };

        let version = self.next_version(&validated.canonical_name);
        let file_path = format!("{}/trait_{}_v{}.py", self.mutations_dir, validated.canonical_name, version);
        std::fs::write(&file_path, &source).map_err(|source_err| EvolutionError::Io {
            path: file_path.clone(),
            source: source_err,
        })?;

        let mutation_id = MutationId::new();
        let record = MutationRecord {
            mutation_id: mutation_id.clone(),
            plan_id: plan.plan_id.clone(),
            cycle_id: plan.cycle_id.clone(),
            trait_name: validated.canonical_name.clone(),
            version,
            source_hash: validated.source_hash.clone(),
            file_path: file_path.clone(),
            status: MutationStatus::SandboxOk,
            failure_reason: None,
            validation_log: Vec::new(),
        };
        self.mutation_store.put_record(&record)?;
        self.mutation_store.put_source(&mutation_id, &source)?;

        self.bus.publish(Event::MutationReady(MutationReadyPayload {
            mutation_id: mutation_id.to_string(),
            plan_id: plan.plan_id.clone(),
            cycle_id: plan.cycle_id.clone(),
            file_path,
            trait_name: validated.canonical_name,
            version,
            code_hash: validated.source_hash,
        }))?;

        Ok(())
    }

    fn next_version(&self, canonical_name: &str) -> u64 {
        let mut versions = self.versions.lock();
        let next = versions.get(canonical_name).copied().unwrap_or(0) + 1;
        versions.insert(canonical_name.to_string(), next);
        next
    }

    fn fail(&self, plan: &EvolutionPlanPayload, reason: ReasonCode, stage: FailureStage, detail: &str) {
        self.bus
            .publish(Event::MutationFailed(MutationFailedPayload {
                mutation_id: MutationId::new().to_string(),
                cycle_id: plan.cycle_id.clone(),
                trait_name: plan.target_class.clone(),
                stage,
                reason,
                detail: detail.to_string(),
            }))
            .ok();
        self.publish_feed(&format!("cycle {} coding failed: {}", plan.cycle_id, detail));
    }

    fn publish_feed(&self, message: &str) {
        self.bus
            .publish(Event::Feed(FeedPayload { source: FEED_SOURCE.to_string(), message: message.to_string() }))
            .ok();
    }

    /// Subscribe to Evolution Plan and dispatch to [`Coder::on_plan`] forever
    /// (spec.md §5 "Coder loop").
    pub async fn run(self: Arc<Self>) {
        let mut rx = self.bus.subscribe("evolution_plan");
        loop {
            match rx.recv().await {
                Ok(Event::EvolutionPlan(plan)) => {
                    if let Err(err) = self.on_plan(&plan).await {
                        tracing::warn!(error = %err, "coder failed to handle evolution plan");
                    }
                }
                Ok(_) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    }
}

#[cfg(test)]
#[path = "coder_tests.rs"]
mod tests;
