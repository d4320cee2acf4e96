// SPDX-License-Identifier: MIT

//! Trait Executor (spec.md §4.3): runs an entity's trait list in order,
//! under a per-trait timeout τ and a per-tick aggregate budget B, and
//! deactivates any trait that times out or raises so a single bad behavior
//! never costs more than τ of CPU and no entity ever exceeds B across all
//! its traits.

use std::time::{Duration, Instant};

use mp_core::{canonical, Entity};

use crate::consts::{ATTACK_DAMAGE, MAX_MOVE_PER_TICK};
use crate::entity_store::EntityStore;
use crate::environment_store::EnvironmentStore;
use crate::registry::Registry;
use crate::traitlang::{self, EntityApi};

/// Runs trait lists against a shared [`Registry`] snapshot.
pub struct Executor<'r> {
    registry: &'r Registry,
}

impl<'r> Executor<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    /// Execute every active, non-deactivated trait on `entity` in list
    /// order. `neighbors` is the rest of the Entity Store with `entity`
    /// already removed by the caller (spec.md §5 "Entity Store ... only
    /// mutated from Tick Engine stages" — the tick engine temporarily owns
    /// the entity being updated so `attack_nearby` can borrow the store
    /// mutably without aliasing it). `on_first_error` is invoked exactly
    /// once per canonical trait name, the first time it fails on any
    /// entity's execution (spec.md §4.3, §7 "Trait-local" errors).
    pub fn execute_all(
        &self,
        entity: &mut Entity,
        neighbors: &mut EntityStore,
        environment: &mut EnvironmentStore,
        trait_timeout: Duration,
        tick_time_budget: Duration,
        mut on_first_error: impl FnMut(&str),
    ) {
        let tick_start = Instant::now();
        let handles = entity.traits.clone();

        for handle in handles {
            if entity.is_trait_deactivated(&handle.canonical_name) {
                continue;
            }
            if tick_start.elapsed() >= tick_time_budget {
                break;
            }

            let Some(entry) = self.registry.get(&handle.canonical_name) else {
                continue;
            };

            let deadline = Instant::now() + trait_timeout;
            let mut adapter = WorldEntityApi { entity, neighbors, environment };
            let result = traitlang::run_execute(&entry.module, &entry.class_name, &mut adapter, deadline);

            if let Err(err) = result {
                let already_deactivated = entity.is_trait_deactivated(&handle.canonical_name);
                entity.deactivate_trait(&handle.canonical_name);
                if !already_deactivated {
                    on_first_error(&handle.canonical_name);
                }
                tracing::warn!(
                    trait_name = %handle.canonical_name,
                    entity_id = %entity.id,
                    error = %err,
                    "trait execution failed; deactivating for this entity"
                );
            }
        }
    }
}

/// Bridges the trait-script [`EntityApi`] to the real Entity Store /
/// Environment Store for the one entity currently being updated.
struct WorldEntityApi<'a> {
    entity: &'a mut Entity,
    neighbors: &'a mut EntityStore,
    environment: &'a mut EnvironmentStore,
}

impl<'a> EntityApi for WorldEntityApi<'a> {
    fn id(&self) -> String {
        self.entity.id.to_string()
    }
    fn x(&self) -> f64 {
        self.entity.x
    }
    fn y(&self) -> f64 {
        self.entity.y
    }
    fn energy(&self) -> f64 {
        self.entity.energy
    }
    fn max_energy(&self) -> f64 {
        self.entity.max_energy
    }
    fn age(&self) -> f64 {
        self.entity.age as f64
    }
    fn max_age(&self) -> f64 {
        self.entity.max_age as f64
    }
    fn metabolism_rate(&self) -> f64 {
        self.entity.metabolism_rate
    }
    fn state(&self) -> String {
        self.entity.state.to_string()
    }
    fn entity_type(&self) -> String {
        self.entity.kind.to_string()
    }
    fn trait_count(&self) -> f64 {
        self.entity.traits.len() as f64
    }

    /// Clamp the requested displacement to `MAX_MOVE_PER_TICK` (spec.md §8
    /// "Movement clamp" law). World-bounds clamping happens later, in the
    /// Physics stage.
    fn move_by(&mut self, dx: f64, dy: f64) {
        let magnitude = (dx * dx + dy * dy).sqrt();
        let (dx, dy) = if magnitude > MAX_MOVE_PER_TICK && magnitude > f64::EPSILON {
            let scale = MAX_MOVE_PER_TICK / magnitude;
            (dx * scale, dy * scale)
        } else {
            (dx, dy)
        };
        self.entity.x += dx;
        self.entity.y += dy;
    }

    fn eat_nearby(&mut self, radius: f64) -> f64 {
        let Some(nearest) = self
            .environment
            .nearby(self.entity.x, self.entity.y, radius)
            .into_iter()
            .min_by(|a, b| {
                let da = (a.x - self.entity.x).powi(2) + (a.y - self.entity.y).powi(2);
                let db = (b.x - self.entity.x).powi(2) + (b.y - self.entity.y).powi(2);
                da.total_cmp(&db)
            })
            .map(|r| r.id)
        else {
            return 0.0;
        };

        let Some(resource) = self.environment.remove(&nearest) else {
            return 0.0;
        };
        self.entity.receive_energy(resource.energy);
        resource.energy
    }

    /// Find the nearest alive entity within `radius` (excluding `self`,
    /// since the tick engine has already removed it from `neighbors`) and
    /// apply a fixed amount of damage.
    fn attack_nearby(&mut self, radius: f64) -> bool {
        let nearest_id = self
            .neighbors
            .nearby(self.entity.x, self.entity.y, radius)
            .into_iter()
            .min_by(|a, b| {
                let da = (a.x - self.entity.x).powi(2) + (a.y - self.entity.y).powi(2);
                let db = (b.x - self.entity.x).powi(2) + (b.y - self.entity.y).powi(2);
                da.total_cmp(&db)
            })
            .map(|e| e.id);

        let Some(target_id) = nearest_id else {
            return false;
        };
        let Some(target) = self.neighbors.get_mut(&target_id) else {
            return false;
        };
        target.energy -= ATTACK_DAMAGE;
        if target.energy <= 0.0 {
            target.state = mp_core::LifecycleState::Dead;
        }
        true
    }

    fn is_alive(&self) -> bool {
        self.entity.is_alive()
    }

    fn deactivate_trait(&mut self, name: &str) {
        self.entity.deactivate_trait(&canonical(name));
    }

    fn activate_trait(&mut self, name: &str) {
        self.entity.activate_trait(&canonical(name));
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
