// SPDX-License-Identifier: MIT

use super::*;

fn sample_entity() -> Entity {
    Entity {
        id: EntityId::new(),
        generation: 0,
        parent_id: None,
        born_at_tick: 0,
        dna_fingerprint: 42,
        x: 10.0,
        y: 10.0,
        radius: 5.0,
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
fn is_alive_reflects_state() {
    let mut e = sample_entity();
    assert!(e.is_alive());
    e.state = LifecycleState::Dead;
    assert!(!e.is_alive());
}

#[test]
fn deactivate_then_activate_trait_round_trips() {
    let mut e = sample_entity();
    e.deactivate_trait("chaser");
    assert!(e.is_trait_deactivated("chaser"));
    e.activate_trait("chaser");
    assert!(!e.is_trait_deactivated("chaser"));
}

#[test]
fn receive_energy_caps_at_max_energy() {
    let mut e = sample_entity();
    e.receive_energy(1000.0);
    assert_eq!(e.energy, 100.0);
    assert_eq!(e.trait_energy_gain, 1000.0, "gain ledger tracks raw amount, not the cap");
}

#[test]
fn receive_energy_ignores_negative_amounts() {
    let mut e = sample_entity();
    e.receive_energy(-5.0);
    assert_eq!(e.energy, 50.0);
    assert_eq!(e.trait_energy_gain, 0.0);
}

#[test]
fn infection_recovers_after_ticking_down() {
    let mut infection = Infection::ignite(2);
    assert!(!infection.tick());
    assert!(infection.infected);
    assert!(infection.tick());
    assert!(!infection.infected);
}

#[test]
fn infection_none_tick_is_a_no_op() {
    let mut infection = Infection::none();
    assert!(!infection.tick());
    assert!(!infection.infected);
}
