// SPDX-License-Identifier: MIT

//! Uniform-grid spatial hash shared by the Entity Store and Environment
//! Store (spec.md §4.2). Rebuilt from scratch every tick rather than
//! maintained incrementally — "simpler and correct with the population
//! sizes in scope," per the spec's own rationale.

use std::collections::HashMap;
use std::hash::Hash;

/// Grid cell size (spec.md §4.2 "cell size S=50").
pub const CELL_SIZE: f64 = 50.0;

fn cell_of(x: f64, y: f64) -> (i64, i64) {
    ((x / CELL_SIZE).floor() as i64, (y / CELL_SIZE).floor() as i64)
}

/// A uniform grid mapping cell coordinates to the ids of entries centered
/// in that cell. Generic over any hashable, cloneable id type so it backs
/// both `EntityId` (Entity Store) and `ResourceId` (Environment Store).
#[derive(Debug, Default)]
pub struct SpatialHash<Id: Eq + Hash + Clone> {
    cells: HashMap<(i64, i64), Vec<Id>>,
}

impl<Id: Eq + Hash + Clone> SpatialHash<Id> {
    pub fn new() -> Self {
        Self { cells: HashMap::new() }
    }

    /// Rehash every entry from scratch (spec.md §4.2 `rebuild_index`).
    pub fn rebuild<'a, I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (&'a Id, f64, f64)>,
        Id: 'a,
    {
        self.cells.clear();
        for (id, x, y) in entries {
            self.cells.entry(cell_of(x, y)).or_default().push(id.clone());
        }
    }

    /// All ids whose cell touches the disk of radius `r` around `(x, y)`.
    /// Callers filter by exact squared distance themselves (spec.md §4.2
    /// `nearby`): this only narrows the candidate set.
    pub fn candidates_near(&self, x: f64, y: f64, r: f64) -> Vec<Id> {
        let (cx, cy) = cell_of(x, y);
        let span = (r / CELL_SIZE).ceil() as i64 + 1;
        let mut out = Vec::new();
        for dx in -span..=span {
            for dy in -span..=span {
                if let Some(ids) = self.cells.get(&(cx + dx, cy + dy)) {
                    out.extend(ids.iter().cloned());
                }
            }
        }
        out
    }
}

#[cfg(test)]
#[path = "spatial_tests.rs"]
mod tests;
