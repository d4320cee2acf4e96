// SPDX-License-Identifier: MIT

//! The Architect (spec.md §4.8 steps 1-5): on an Evolution Trigger, tries
//! to acquire the cycle mutex, and if it wins, asks the LLM for a plan and
//! publishes it for the Coder. Losing the mutex is not an error — another
//! cycle is already in flight — so it just posts a "skipped" feed message
//! and returns.

use std::sync::Arc;
use std::time::Duration;

use mp_core::{
    CycleId, CycleStage, Event, EvolutionPlanPayload, EvolutionTriggerPayload, FeedPayload,
};
use mp_bus::EventBus;
use mp_storage::CycleStore;

use crate::error::EvolutionError;
use crate::llm::{LlmClient, PlanRequest, WorldContext};

const FEED_SOURCE: &str = "architect";

pub struct Architect {
    bus: Arc<dyn EventBus>,
    cycle_store: Arc<CycleStore>,
    llm: Arc<dyn LlmClient>,
    cycle_lock_ttl: Duration,
}

impl Architect {
    pub fn new(
        bus: Arc<dyn EventBus>,
        cycle_store: Arc<CycleStore>,
        llm: Arc<dyn LlmClient>,
        cycle_lock_ttl: Duration,
    ) -> Self {
        Self { bus, cycle_store, llm, cycle_lock_ttl }
    }

    /// Handle one Evolution Trigger (spec.md §4.8 steps 1-5). `now_epoch_ms`
    /// is threaded in rather than read from a clock field so the cycle
    /// mutex's TTL bookkeeping and this method's own tests share one clock.
    pub async fn on_trigger(
        &self,
        trigger: &EvolutionTriggerPayload,
        now_epoch_ms: u64,
    ) -> Result<(), EvolutionError> {
        let acquired = self.cycle_store.try_start(
            &trigger.trigger_id,
            &trigger.problem_type,
            &trigger.severity,
            self.cycle_lock_ttl,
            now_epoch_ms,
        )?;

        if !acquired {
            self.publish_feed(&format!(
                "cycle {} skipped: another evolution cycle is already running",
                trigger.cycle_id
            ));
            return Ok(());
        }

        self.publish_feed(&format!(
            "cycle {} starting: {} ({})",
            trigger.cycle_id, trigger.problem_type, trigger.severity
        ));

        let request = PlanRequest {
            problem_type: trigger.problem_type.clone(),
            severity: trigger.severity.clone(),
            affected_entities: trigger.affected_entities,
            suggested_area: trigger.suggested_area.clone(),
            world_context: WorldContext {
                entity_count: trigger.world_context.entity_count,
                avg_energy: trigger.world_context.avg_energy,
                resource_count: trigger.world_context.resource_count,
                death_stats: trigger
                    .world_context
                    .death_stats
                    .iter()
                    .map(|(cause, count)| (cause.to_string(), *count))
                    .collect(),
            },
        };

        let plan = match self.llm.propose_plan(request).await {
            Ok(plan) if plan.is_complete() => plan,
            Ok(_) => {
                self.fail(&trigger.cycle_id, now_epoch_ms, "llm plan response missing required fields");
                return Ok(());
            }
            Err(err) => {
                self.fail(&trigger.cycle_id, now_epoch_ms, &format!("llm plan call failed: {err}"));
                return Ok(());
            }
        };

        let plan_id = CycleId::new().to_string();
        self.bus.publish(Event::EvolutionPlan(EvolutionPlanPayload {
            plan_id,
            trigger_id: trigger.trigger_id.clone(),
            cycle_id: trigger.cycle_id.clone(),
            action_type: plan.action_type.clone(),
            description: plan.description.clone(),
            target_class: plan.trait_name.clone(),
        }))?;

        self.cycle_store.update_stage(CycleStage::Coding, now_epoch_ms)?;
        Ok(())
    }

    fn fail(&self, cycle_id: &str, now_epoch_ms: u64, reason: &str) {
        self.cycle_store.fail(reason, now_epoch_ms).ok();
        self.publish_feed(&format!("cycle {cycle_id} failed: {reason}"));
    }

    fn publish_feed(&self, message: &str) {
        self.bus
            .publish(Event::Feed(FeedPayload { source: FEED_SOURCE.to_string(), message: message.to_string() }))
            .ok();
    }

    /// Subscribe to Evolution Trigger and dispatch to [`Architect::on_trigger`]
    /// forever (spec.md §5 "Architect loop").
    pub async fn run<C: mp_core::Clock + 'static>(self: Arc<Self>, clock: C) {
        let mut rx = self.bus.subscribe("evolution_trigger");
        loop {
            match rx.recv().await {
                Ok(Event::EvolutionTrigger(trigger)) => {
                    let now = clock.epoch_ms();
                    if let Err(err) = self.on_trigger(&trigger, now).await {
                        tracing::warn!(error = %err, "architect failed to handle evolution trigger");
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
#[path = "architect_tests.rs"]
mod tests;
