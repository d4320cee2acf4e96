// SPDX-License-Identifier: MIT

use super::*;
use mp_core::{EntityKind, Infection, LifecycleState};
use std::collections::HashSet;

fn sample_entity(x: f64, y: f64, radius: f64) -> Entity {
    Entity {
        id: EntityId::new(),
        generation: 0,
        parent_id: None,
        born_at_tick: 0,
        dna_fingerprint: 1,
        x,
        y,
        radius,
        energy: 50.0,
        max_energy: 100.0,
        metabolism_rate: 1.0,
        max_age: 0,
        age: 0,
        state: LifecycleState::Alive,
        kind: EntityKind::Molbot,
        infection: Infection::none(),
        traits: Vec::new(),
        deactivated_traits: HashSet::new(),
        trait_energy_gain: 0.0,
    }
}

#[test]
fn insert_get_remove_round_trip() {
    let mut store = EntityStore::new();
    let e = sample_entity(1.0, 1.0, 5.0);
    let id = e.id;
    store.insert(e);

    assert_eq!(store.len(), 1);
    assert!(store.get(&id).is_some());

    let removed = store.remove(&id).expect("entity should be present");
    assert_eq!(removed.id, id);
    assert!(store.get(&id).is_none());
    assert!(store.is_empty());
}

#[test]
fn nearby_returns_only_alive_entries_within_exact_radius() {
    let mut store = EntityStore::new();
    let close = sample_entity(10.0, 10.0, 5.0);
    let close_id = close.id;
    let far = sample_entity(500.0, 500.0, 5.0);

    let mut dead = sample_entity(12.0, 10.0, 5.0);
    dead.state = LifecycleState::Dead;

    store.insert(close);
    store.insert(far);
    store.insert(dead);
    store.rebuild_index();

    let found = store.nearby(10.0, 10.0, 5.0);
    let ids: Vec<EntityId> = found.iter().map(|e| e.id).collect();

    assert_eq!(ids.len(), 1);
    assert!(ids.contains(&close_id));
}

#[test]
fn nearby_excludes_entries_past_the_exact_distance_even_in_candidate_cell() {
    let mut store = EntityStore::new();
    // Same grid cell (CELL_SIZE = 50) but farther than the query radius.
    let near_cell_far_point = sample_entity(40.0, 0.0, 1.0);
    store.insert(near_cell_far_point);
    store.rebuild_index();

    let found = store.nearby(0.0, 0.0, 5.0);
    assert!(found.is_empty());
}

#[test]
fn detect_overlaps_finds_one_deduplicated_pair_for_overlapping_radii() {
    let mut store = EntityStore::new();
    let a = sample_entity(0.0, 0.0, 5.0);
    let b = sample_entity(6.0, 0.0, 5.0); // radii sum 10 > distance 6: overlapping
    let c = sample_entity(200.0, 200.0, 5.0); // isolated

    let (a_id, b_id) = (a.id, b.id);
    store.insert(a);
    store.insert(b);
    store.insert(c);
    store.rebuild_index();

    let pairs = store.detect_overlaps();
    assert_eq!(pairs.len(), 1);
    let (x, y) = pairs[0];
    assert!((x == a_id && y == b_id) || (x == b_id && y == a_id));
}

#[test]
fn detect_overlaps_ignores_near_but_non_overlapping_and_dead_entities() {
    let mut store = EntityStore::new();
    let a = sample_entity(0.0, 0.0, 5.0);
    let b = sample_entity(20.0, 0.0, 5.0); // radii sum 10 < distance 20: not overlapping

    let mut dead_overlap = sample_entity(2.0, 0.0, 5.0);
    dead_overlap.state = LifecycleState::Dead;

    store.insert(a);
    store.insert(b);
    store.insert(dead_overlap);
    store.rebuild_index();

    assert!(store.detect_overlaps().is_empty());
}

#[test]
fn rebuild_index_reflects_moved_positions() {
    let mut store = EntityStore::new();
    let mut e = sample_entity(0.0, 0.0, 5.0);
    let id = e.id;
    e.x = 0.0;
    e.y = 0.0;
    store.insert(e);
    store.rebuild_index();
    assert_eq!(store.nearby(0.0, 0.0, 1.0).len(), 1);

    if let Some(moved) = store.get_mut(&id) {
        moved.x = 900.0;
        moved.y = 900.0;
    }
    store.rebuild_index();

    assert!(store.nearby(0.0, 0.0, 1.0).is_empty());
    assert_eq!(store.nearby(900.0, 900.0, 1.0).len(), 1);
}

#[test]
fn alive_count_ignores_dead_entities() {
    let mut store = EntityStore::new();
    store.insert(sample_entity(0.0, 0.0, 1.0));
    let mut dead = sample_entity(1.0, 1.0, 1.0);
    dead.state = LifecycleState::Dead;
    store.insert(dead);

    assert_eq!(store.len(), 2);
    assert_eq!(store.alive_count(), 1);
}
