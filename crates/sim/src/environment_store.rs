// SPDX-License-Identifier: MIT

//! Environment Store: a keyed collection of resources sharing the same
//! spatial-hash indexing strategy as the Entity Store (spec.md §4.2).
//! Resources carry no radius, so there is no overlap concept to detect here.

use std::collections::HashMap;

use mp_core::{Resource, ResourceId};

use crate::spatial::SpatialHash;

#[derive(Default)]
pub struct EnvironmentStore {
    resources: HashMap<ResourceId, Resource>,
    index: SpatialHash<ResourceId>,
}

impl EnvironmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, resource: Resource) {
        self.resources.insert(resource.id, resource);
    }

    pub fn remove(&mut self, id: &ResourceId) -> Option<Resource> {
        self.resources.remove(id)
    }

    pub fn get(&self, id: &ResourceId) -> Option<&Resource> {
        self.resources.get(id)
    }

    pub fn get_mut(&mut self, id: &ResourceId) -> Option<&mut Resource> {
        self.resources.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Resource> {
        self.resources.values_mut()
    }

    pub fn ids(&self) -> impl Iterator<Item = &ResourceId> {
        self.resources.keys()
    }

    /// Rehash the spatial index (spec.md §4.2 `rebuild_index`), called every
    /// tick after resource respawn.
    pub fn rebuild_index(&mut self) {
        self.index.rebuild(self.resources.values().map(|r| (&r.id, r.x, r.y)));
    }

    /// Entries within squared distance `r*r` of `(x, y)` (spec.md §4.2
    /// `nearby`).
    pub fn nearby(&self, x: f64, y: f64, r: f64) -> Vec<&Resource> {
        let r2 = r * r;
        self.index
            .candidates_near(x, y, r)
            .into_iter()
            .filter_map(|id| self.resources.get(&id))
            .filter(|res| {
                let dx = res.x - x;
                let dy = res.y - y;
                dx * dx + dy * dy <= r2
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "environment_store_tests.rs"]
mod tests;
