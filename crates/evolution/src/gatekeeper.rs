// SPDX-License-Identifier: MIT

//! The Gatekeeper (spec.md §4.10/§6 "Inbound from collaborators"): accepts
//! externally-proposed mutations over the same Code Validator and
//! mutation-ready path the Coder uses, but enforces rate limits since the
//! source is an untrusted external agent rather than this process's own
//! LLM client.

use std::collections::HashMap;
use std::sync::Arc;

use mp_core::{
    CycleId, Event, FailureStage, FeedPayload, MutationAppliedPayload, MutationFailedPayload,
    MutationId, MutationReadyPayload, MutationRecord, MutationStatus, ReasonCode,
};
use mp_bus::EventBus;
use mp_storage::MutationStore;
use parking_lot::Mutex;
use thiserror::Error;

const FEED_SOURCE: &str = "gatekeeper";
const MAX_PER_IP_PER_MINUTE: usize = 10;
const MAX_PER_AGENT_PER_HOUR: usize = 60;
const MAX_IN_FLIGHT_PER_AGENT: usize = 5;

/// An externally-proposed mutation (spec.md §6 "Externally-proposed
/// mutation carries {agent_id, task_id?, trait_name (lower snake_case),
/// goal, source}").
#[derive(Debug, Clone, PartialEq)]
pub struct MutationProposal {
    pub agent_id: String,
    pub task_id: Option<String>,
    pub trait_name: String,
    pub goal: String,
    pub source: String,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GatekeeperError {
    #[error("rate limit exceeded: more than {MAX_PER_IP_PER_MINUTE} proposals/min from this IP")]
    IpRateLimited,
    #[error("rate limit exceeded: more than {MAX_PER_AGENT_PER_HOUR} proposals/hour from this agent")]
    AgentRateLimited,
    #[error("rate limit exceeded: more than {MAX_IN_FLIGHT_PER_AGENT} in-flight mutations for this agent")]
    TooManyInFlight,
    #[error("mutation rejected: {0}")]
    Rejected(String),
}

#[derive(Default)]
struct RateLimitState {
    /// Epoch-ms timestamps of recent submissions, per source IP.
    ip_window: HashMap<String, Vec<u64>>,
    /// Epoch-ms timestamps of recent submissions, per agent.
    agent_window: HashMap<String, Vec<u64>>,
    /// Mutations this agent has proposed that haven't reached a terminal
    /// status yet.
    in_flight: HashMap<String, usize>,
}

pub struct Gatekeeper {
    bus: Arc<dyn EventBus>,
    mutation_store: Arc<MutationStore>,
    mutations_dir: String,
    versions: Mutex<HashMap<String, u64>>,
    limits: Mutex<RateLimitState>,
    /// `mutation_id -> agent_id` for mutations this gatekeeper itself
    /// accepted, so `run()` knows whose in-flight slot to free when the
    /// mutation reaches a terminal status. Mutations from the Coder's own
    /// pipeline never appear here and are silently ignored.
    pending_agents: Mutex<HashMap<String, String>>,
}

impl Gatekeeper {
    pub fn new(bus: Arc<dyn EventBus>, mutation_store: Arc<MutationStore>, mutations_dir: String) -> Self {
        Self {
            bus,
            mutation_store,
            mutations_dir,
            versions: Mutex::new(HashMap::new()),
            limits: Mutex::new(RateLimitState::default()),
            pending_agents: Mutex::new(HashMap::new()),
        }
    }

    /// Validate and queue an externally-proposed mutation, enforcing rate
    /// limits first (spec.md §6). Returns the minted mutation id on success.
    pub fn submit(
        &self,
        proposal: &MutationProposal,
        source_ip: &str,
        now_epoch_ms: u64,
    ) -> Result<MutationId, GatekeeperError> {
        self.check_rate_limits(&proposal.agent_id, source_ip, now_epoch_ms)?;

        let is_hash_used = |hash: &str| self.mutation_store.is_hash_used(hash).unwrap_or(false);
        let validated = match mp_sim::traitlang::validate(&proposal.source, &is_hash_used) {
            Ok(validated) => validated,
            Err(err) => {
                self.publish_rejection(proposal, err.reason_code(), &err.to_string());
                return Err(GatekeeperError::Rejected(err.to_string()));
            }
        };

        let version = self.next_version(&validated.canonical_name);
        let file_path = format!("{}/trait_{}_v{}.py", self.mutations_dir, validated.canonical_name, version);
        if let Err(io_err) = std::fs::write(&file_path, &proposal.source) {
            tracing::warn!(error = %io_err, path = %file_path, "gatekeeper failed to write mutation file");
            self.publish_rejection(proposal, ReasonCode::ImportFailed, &io_err.to_string());
            return Err(GatekeeperError::Rejected(io_err.to_string()));
        }

        let mutation_id = MutationId::new();
        let plan_id = format!("external:{}", proposal.agent_id);
        let record = MutationRecord {
            mutation_id: mutation_id.clone(),
            plan_id: plan_id.clone(),
            cycle_id: CycleId::new().to_string(),
            trait_name: validated.canonical_name.clone(),
            version,
            source_hash: validated.source_hash.clone(),
            file_path: file_path.clone(),
            status: MutationStatus::SandboxOk,
            failure_reason: None,
            validation_log: vec![format!("externally proposed by {} ({})", proposal.agent_id, proposal.goal)],
        };
        self.mutation_store.put_record(&record).ok();
        self.mutation_store.put_source(&mutation_id, &proposal.source).ok();

        self.limits.lock().in_flight.entry(proposal.agent_id.clone()).and_modify(|n| *n += 1).or_insert(1);
        self.pending_agents.lock().insert(mutation_id.to_string(), proposal.agent_id.clone());

        self.bus
            .publish(Event::MutationReady(MutationReadyPayload {
                mutation_id: mutation_id.to_string(),
                plan_id,
                cycle_id: record.cycle_id,
                file_path,
                trait_name: validated.canonical_name,
                version,
                code_hash: validated.source_hash,
            }))
            .ok();
        self.publish_feed(&format!("{} proposed by {} accepted", proposal.trait_name, proposal.agent_id));

        Ok(mutation_id)
    }

    /// Mark an in-flight mutation terminal, freeing its agent's slot. Called
    /// from [`Gatekeeper::run`] when it observes Mutation Applied/Failed for
    /// a mutation this gatekeeper accepted.
    pub fn mark_resolved(&self, agent_id: &str) {
        let mut limits = self.limits.lock();
        if let Some(count) = limits.in_flight.get_mut(agent_id) {
            *count = count.saturating_sub(1);
        }
    }

    /// Free the agent slot for a mutation that reached the registry
    /// (spec.md §6 "mutation_applied"). A no-op for mutations this
    /// gatekeeper didn't accept.
    pub fn on_mutation_applied(&self, payload: &MutationAppliedPayload) {
        if let Some(agent_id) = self.pending_agents.lock().remove(&payload.mutation_id) {
            self.mark_resolved(&agent_id);
        }
    }

    /// Free the agent slot for a mutation that failed terminally (spec.md
    /// §6 "mutation_failed"). A no-op for mutations this gatekeeper didn't
    /// accept.
    pub fn on_mutation_failed(&self, payload: &MutationFailedPayload) {
        if let Some(agent_id) = self.pending_agents.lock().remove(&payload.mutation_id) {
            self.mark_resolved(&agent_id);
        }
    }

    fn check_rate_limits(&self, agent_id: &str, source_ip: &str, now_epoch_ms: u64) -> Result<(), GatekeeperError> {
        let mut limits = self.limits.lock();

        let ip_entries = limits.ip_window.entry(source_ip.to_string()).or_default();
        ip_entries.retain(|ts| now_epoch_ms.saturating_sub(*ts) < 60_000);
        if ip_entries.len() >= MAX_PER_IP_PER_MINUTE {
            return Err(GatekeeperError::IpRateLimited);
        }

        let agent_entries = limits.agent_window.entry(agent_id.to_string()).or_default();
        agent_entries.retain(|ts| now_epoch_ms.saturating_sub(*ts) < 3_600_000);
        if agent_entries.len() >= MAX_PER_AGENT_PER_HOUR {
            return Err(GatekeeperError::AgentRateLimited);
        }

        if limits.in_flight.get(agent_id).copied().unwrap_or(0) >= MAX_IN_FLIGHT_PER_AGENT {
            return Err(GatekeeperError::TooManyInFlight);
        }

        limits.ip_window.get_mut(source_ip).expect("just inserted").push(now_epoch_ms);
        limits.agent_window.get_mut(agent_id).expect("just inserted").push(now_epoch_ms);
        Ok(())
    }

    fn publish_rejection(&self, proposal: &MutationProposal, reason: ReasonCode, detail: &str) {
        self.bus
            .publish(Event::MutationFailed(MutationFailedPayload {
                mutation_id: MutationId::new().to_string(),
                cycle_id: format!("external:{}", proposal.agent_id),
                trait_name: proposal.trait_name.clone(),
                stage: FailureStage::Validation,
                reason,
                detail: detail.to_string(),
            }))
            .ok();
        self.publish_feed(&format!("{} proposed by {} rejected: {}", proposal.trait_name, proposal.agent_id, detail));
    }

    fn publish_feed(&self, message: &str) {
        self.bus
            .publish(Event::Feed(FeedPayload { source: FEED_SOURCE.to_string(), message: message.to_string() }))
            .ok();
    }

    fn next_version(&self, canonical_name: &str) -> u64 {
        let mut versions = self.versions.lock();
        let next = versions.get(canonical_name).copied().unwrap_or(0) + 1;
        versions.insert(canonical_name.to_string(), next);
        next
    }

    /// Subscribe to Mutation Applied and Mutation Failed and free the
    /// originating agent's in-flight slot as each terminal status arrives
    /// (spec.md §6 "per agent active (≤5 in-flight)"). Without this loop
    /// `in_flight` only ever grows, permanently rate-limiting an agent once
    /// it has five mutations outstanding.
    pub async fn run(self: Arc<Self>) {
        let mut applied_rx = self.bus.subscribe("mutation_applied");
        let mut failed_rx = self.bus.subscribe("mutation_failed");
        loop {
            tokio::select! {
                event = applied_rx.recv() => {
                    match event {
                        Ok(Event::MutationApplied(payload)) => self.on_mutation_applied(&payload),
                        Ok(_) => {}
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
                event = failed_rx.recv() => {
                    match event {
                        Ok(Event::MutationFailed(payload)) => self.on_mutation_failed(&payload),
                        Ok(_) => {}
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "gatekeeper_tests.rs"]
mod tests;
