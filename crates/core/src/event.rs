// SPDX-License-Identifier: MIT

//! The wire event taxonomy carried over the in-process event bus (spec.md
//! §5 "Event Bus", the eight channels and their payload shapes).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::entity::DeathCause;
use crate::mutation::{FailureStage, ReasonCode};

/// Telemetry payload published once per tick (spec.md §4.1 step 12).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryPayload {
    pub tick: u64,
    pub entity_count: u64,
    pub avg_energy: f64,
    pub resource_count: u64,
    pub death_stats: HashMap<DeathCause, u64>,
}

/// The compact world context carried on an Evolution Trigger (spec.md §6
/// "world_context"): enough for the Architect's prompt without requiring
/// it to re-read the snapshot cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionWorldContext {
    pub entity_count: u64,
    pub avg_energy: f64,
    pub resource_count: u64,
    pub death_stats: HashMap<DeathCause, u64>,
}

/// Published by the Watcher when it decides a cycle should start (spec.md
/// §6 evolution_trigger row: "trigger_id, problem_type, severity,
/// affected_entities, suggested_area, snapshot_key, cycle_id,
/// world_context"). `trigger_id` is what the cycle mutex (`evo:cycle:lock`)
/// is keyed on; `cycle_id` identifies the `EvolutionCycle` this trigger
/// starts and is what flows through the rest of the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionTriggerPayload {
    pub trigger_id: String,
    pub cycle_id: String,
    pub problem_type: String,
    pub severity: String,
    pub affected_entities: u64,
    pub suggested_area: Option<String>,
    pub snapshot_key: String,
    pub world_context: EvolutionWorldContext,
}

/// Published by the Architect once it has produced a plan for a cycle
/// (spec.md §6 evolution_plan row: "plan_id, trigger_id, cycle_id,
/// action_type, description, target_class").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionPlanPayload {
    pub plan_id: String,
    pub trigger_id: String,
    pub cycle_id: String,
    pub action_type: String,
    pub description: String,
    pub target_class: String,
}

/// Published by the Coder or Gatekeeper once a mutation has passed
/// validation and is waiting on the Patcher to load it (spec.md §6
/// "mutation_ready" row). `plan_id` is a Gatekeeper sentinel
/// (`external:{agent_id}`) for externally-proposed mutations, which have
/// no Architect-issued plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationReadyPayload {
    pub mutation_id: String,
    pub plan_id: String,
    pub cycle_id: String,
    pub file_path: String,
    pub trait_name: String,
    pub version: u64,
    pub code_hash: String,
}

/// Published once the registry swap for a ready mutation has taken effect
/// and at least one entity is observed running it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationAppliedPayload {
    pub mutation_id: String,
    pub trait_name: String,
    pub version: u64,
    pub applied_at_tick: u64,
}

/// Published when the Coder or Patcher rejects or fails a mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationFailedPayload {
    pub mutation_id: String,
    pub cycle_id: String,
    pub trait_name: String,
    pub stage: FailureStage,
    pub reason: ReasonCode,
    pub detail: String,
}

/// Published when the Watcher's fitness rollback reverts a trait family to
/// its previous version (spec.md §4.7 "Fitness rollback", §6
/// mutation_rollback row: "mutation_id, trait_name, reason, fitness_delta").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationRollbackPayload {
    pub mutation_id: String,
    pub trait_name: String,
    pub reason: String,
    pub fitness_delta: f64,
}

/// Forwarded from an external collaborator to drive a manual feed/trigger
/// (spec.md §4.10 "Manual Trigger API").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedPayload {
    pub source: String,
    pub message: String,
}

/// The full set of events carried on the bus. Tagged by `type` so a single
/// channel's JSON payloads self-describe; `#[serde(other)]` absorbs any
/// future variant a newer publisher emits so older subscribers don't choke
/// on deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "telemetry")]
    Telemetry(TelemetryPayload),
    #[serde(rename = "evolution_trigger")]
    EvolutionTrigger(EvolutionTriggerPayload),
    #[serde(rename = "evolution_plan")]
    EvolutionPlan(EvolutionPlanPayload),
    #[serde(rename = "mutation_ready")]
    MutationReady(MutationReadyPayload),
    #[serde(rename = "mutation_applied")]
    MutationApplied(MutationAppliedPayload),
    #[serde(rename = "mutation_failed")]
    MutationFailed(MutationFailedPayload),
    #[serde(rename = "mutation_rollback")]
    MutationRollback(MutationRollbackPayload),
    #[serde(rename = "feed")]
    Feed(FeedPayload),
    #[serde(other, skip_serializing)]
    Unknown,
}

impl Event {
    /// The bus channel name this event is published on (spec.md §5 table).
    pub fn channel(&self) -> &'static str {
        match self {
            Event::Telemetry(_) => "telemetry",
            Event::EvolutionTrigger(_) => "evolution_trigger",
            Event::EvolutionPlan(_) => "evolution_plan",
            Event::MutationReady(_) => "mutation_ready",
            Event::MutationApplied(_) => "mutation_applied",
            Event::MutationFailed(_) => "mutation_failed",
            Event::MutationRollback(_) => "mutation_rollback",
            Event::Feed(_) => "feed",
            Event::Unknown => "unknown",
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
