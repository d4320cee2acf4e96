// SPDX-License-Identifier: MIT

//! The thin wire boundary for external collaborators (spec.md §6 "Inbound
//! from collaborators"). Manual triggers are published straight onto the
//! event bus as an `evolution_trigger`, exactly like the Watcher's own
//! anomaly path. Mutation proposals are forwarded to
//! [`mp_evolution::Gatekeeper`], which owns the rate limiting; this module
//! only shapes the inbound wire request into that crate's types.

use std::sync::Arc;

use mp_bus::EventBus;
use mp_core::{CycleId, Event, EvolutionTriggerPayload, EvolutionWorldContext};
use mp_evolution::{Gatekeeper, GatekeeperError, MutationProposal};

use crate::error::NetError;

/// `{problem_type, severity ∈ [0,1]}` (spec.md §6 "Manual trigger carries").
#[derive(Debug, Clone, PartialEq)]
pub struct ManualTriggerRequest {
    pub problem_type: String,
    pub severity: f64,
}

/// Publishes manual triggers and forwards mutation proposals to the
/// Gatekeeper. Both calls are synchronous fire-and-forget from the
/// collaborator's point of view; outcomes surface on the `feed` and
/// `mutation_*` channels.
pub struct TriggerApi {
    bus: Arc<dyn EventBus>,
    gatekeeper: Arc<Gatekeeper>,
}

impl TriggerApi {
    pub fn new(bus: Arc<dyn EventBus>, gatekeeper: Arc<Gatekeeper>) -> Self {
        Self { bus, gatekeeper }
    }

    /// Publish a manual evolution trigger (spec.md §6 channel table:
    /// `evolution_trigger | Watcher, manual-API`).
    pub fn fire_manual_trigger(&self, request: &ManualTriggerRequest) -> Result<(), NetError> {
        if !(0.0..=1.0).contains(&request.severity) {
            return Err(NetError::InvalidTrigger(format!(
                "severity {} out of range [0,1]",
                request.severity
            )));
        }

        let payload = EvolutionTriggerPayload {
            trigger_id: CycleId::new().to_string(),
            cycle_id: CycleId::new().to_string(),
            problem_type: request.problem_type.clone(),
            severity: severity_label(request.severity).to_string(),
            affected_entities: 0,
            suggested_area: None,
            snapshot_key: String::new(),
            world_context: EvolutionWorldContext {
                entity_count: 0,
                avg_energy: 0.0,
                resource_count: 0,
                death_stats: Default::default(),
            },
        };
        self.bus.publish(Event::EvolutionTrigger(payload))?;
        Ok(())
    }

    /// Forward an externally-proposed mutation to the Gatekeeper (spec.md
    /// §6 "Externally-proposed mutation carries..."), enforcing its rate
    /// limits.
    pub fn propose_mutation(
        &self,
        proposal: &MutationProposal,
        source_ip: &str,
        now_epoch_ms: u64,
    ) -> Result<String, GatekeeperError> {
        self.gatekeeper.submit(proposal, source_ip, now_epoch_ms).map(|id| id.to_string())
    }
}

/// Bucket a raw `[0,1]` severity into the same label vocabulary the
/// Watcher's anomaly detector uses, so the Architect's prompt-building
/// code doesn't need to special-case manually-triggered cycles.
fn severity_label(severity: f64) -> &'static str {
    if severity >= 0.75 {
        "critical"
    } else if severity >= 0.5 {
        "high"
    } else if severity >= 0.25 {
        "medium"
    } else {
        "low"
    }
}

#[cfg(test)]
#[path = "trigger_api_tests.rs"]
mod tests;
