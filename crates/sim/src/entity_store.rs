// SPDX-License-Identifier: MIT

//! Entity Store: a keyed collection of entities with a 2-D spatial index
//! (spec.md §4.2). Owned exclusively by the Tick Engine; mutated only from
//! its stages (spec.md §5 "Shared-resource policy").

use std::collections::HashMap;

use mp_core::{Entity, EntityId};

use crate::spatial::SpatialHash;

#[derive(Default)]
pub struct EntityStore {
    entities: HashMap<EntityId, Entity>,
    index: SpatialHash<EntityId>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entity: Entity) {
        self.entities.insert(entity.id, entity);
    }

    pub fn remove(&mut self, id: &EntityId) -> Option<Entity> {
        self.entities.remove(id)
    }

    pub fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn get_mut(&mut self, id: &EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.values_mut()
    }

    pub fn ids(&self) -> impl Iterator<Item = &EntityId> {
        self.entities.keys()
    }

    pub fn alive_count(&self) -> usize {
        self.entities.values().filter(|e| e.is_alive()).count()
    }

    /// Rehash the spatial index from the current alive-and-dead positions
    /// (spec.md §4.2 `rebuild_index`, called every tick after movement).
    pub fn rebuild_index(&mut self) {
        self.index.rebuild(self.entities.values().map(|e| (&e.id, e.x, e.y)));
    }

    /// Entries within squared distance `r*r` of `(x, y)` (spec.md §4.2
    /// `nearby`). Dead entries are excluded.
    pub fn nearby(&self, x: f64, y: f64, r: f64) -> Vec<&Entity> {
        let r2 = r * r;
        self.index
            .candidates_near(x, y, r)
            .into_iter()
            .filter_map(|id| self.entities.get(&id))
            .filter(|e| e.is_alive())
            .filter(|e| {
                let dx = e.x - x;
                let dy = e.y - y;
                dx * dx + dy * dy <= r2
            })
            .collect()
    }

    /// Unique unordered alive-entity pairs whose radii overlap (spec.md
    /// §4.2 `detect_overlaps`), deduplicated with a sorted-id check set.
    pub fn detect_overlaps(&self) -> Vec<(EntityId, EntityId)> {
        let mut seen = std::collections::HashSet::new();
        let mut pairs = Vec::new();
        for a in self.entities.values().filter(|e| e.is_alive()) {
            let max_reach = a.radius + 64.0; // generous bound on any single other radius
            for b in self.nearby(a.x, a.y, max_reach) {
                if a.id == b.id || !b.is_alive() {
                    continue;
                }
                let dx = a.x - b.x;
                let dy = a.y - b.y;
                let dist2 = dx * dx + dy * dy;
                let min_dist = a.radius + b.radius;
                if dist2 >= min_dist * min_dist {
                    continue;
                }
                let key = if a.id.as_str() < b.id.as_str() {
                    (a.id, b.id)
                } else {
                    (b.id, a.id)
                };
                if seen.insert(key) {
                    pairs.push(key);
                }
            }
        }
        pairs
    }
}

#[cfg(test)]
#[path = "entity_store_tests.rs"]
mod tests;
