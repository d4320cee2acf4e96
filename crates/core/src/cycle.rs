// SPDX-License-Identifier: MIT

//! Evolution cycles: one pass through Watcher -> Architect -> Coder ->
//! Patcher, serialized by the cross-process cycle lock (spec.md §4.6-§4.9).

use serde::{Deserialize, Serialize};

use crate::define_id;

define_id! {
    /// Opaque evolution-cycle identifier.
    pub struct CycleId("cyc-");
}

/// Which stage of the pipeline a cycle is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStage {
    Planning,
    Coding,
    Patching,
    Done,
    Failed,
}

crate::simple_display! {
    CycleStage {
        Planning => "planning",
        Coding => "coding",
        Patching => "patching",
        Done => "done",
        Failed => "failed",
    }
}

impl CycleStage {
    /// Forward-only progression; `Failed` is reachable from any non-terminal
    /// stage, but once `Done` or `Failed` a cycle never resumes.
    pub fn can_transition_to(self, next: CycleStage) -> bool {
        use CycleStage::*;
        if matches!(self, Done | Failed) {
            return false;
        }
        matches!(
            (self, next),
            (Planning, Coding)
                | (Coding, Patching)
                | (Patching, Done)
                | (Planning, Failed)
                | (Coding, Failed)
                | (Patching, Failed)
        )
    }
}

/// What triggered an evolution cycle (spec.md §4.6 "Evolution Trigger").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerReason {
    Anomaly,
    FitnessRollback,
    Periodic,
    Manual,
}

crate::simple_display! {
    TriggerReason {
        Anomaly => "anomaly",
        FitnessRollback => "fitness_rollback",
        Periodic => "periodic",
        Manual => "manual",
    }
}

/// One pass through the evolution pipeline for a single proposed trait.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionCycle {
    pub cycle_id: CycleId,
    pub trigger_reason: TriggerReason,
    pub triggered_at_tick: u64,
    pub stage: CycleStage,
    pub plan_id: Option<String>,
    pub mutation_id: Option<String>,
}

impl EvolutionCycle {
    pub fn new(trigger_reason: TriggerReason, triggered_at_tick: u64) -> Self {
        Self {
            cycle_id: CycleId::new(),
            trigger_reason,
            triggered_at_tick,
            stage: CycleStage::Planning,
            plan_id: None,
            mutation_id: None,
        }
    }

    pub fn advance(&mut self, next: CycleStage) -> Result<(), String> {
        if !self.stage.can_transition_to(next) {
            return Err(format!(
                "illegal cycle stage transition: {} -> {next}",
                self.stage
            ));
        }
        self.stage = next;
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.stage, CycleStage::Done | CycleStage::Failed)
    }
}

#[cfg(test)]
#[path = "cycle_tests.rs"]
mod tests;
