// SPDX-License-Identifier: MIT

//! Simulation constants that are physical properties of the world rather
//! than operator-tunable knobs (spec.md §6 lists the configurable set;
//! these aren't in it).

/// Hard clamp on any single `entity.move(dx, dy)` displacement per tick
/// (spec.md §8 "Movement clamp" law), also the distance a predator closes
/// on its target per tick (spec.md §4.1 step 4).
pub const MAX_MOVE_PER_TICK: f64 = 5.0;

/// Energy removed from an `attack_nearby` target per successful hit.
pub const ATTACK_DAMAGE: f64 = 20.0;

/// Radius within which the predator regulator looks for its nearest
/// molbot (spec.md §4.1 step 4).
pub const PREDATOR_HUNT_RADIUS: f64 = 150.0;

/// Radius within which the virus regulator attempts to infect neighbors
/// (spec.md §4.1 step 5).
pub const VIRUS_INFECTION_RADIUS: f64 = 40.0;

/// Per-tick probability of a neighbor infection while the virus is active.
pub const VIRUS_INFECTION_PROBABILITY: f64 = 0.02;

/// Per-tick probability of the virus regulator igniting while dormant and
/// the molbot population exceeds `Config::virus_spawn_threshold`.
pub const VIRUS_IGNITION_PROBABILITY: f64 = 0.001;

/// How many ticks an infected entity takes to recover.
pub const VIRUS_RECOVERY_TICKS: u32 = 200;

/// How many entities the organic-growth stage spawns per tick while below
/// `min_population` (spec.md §4.1 step 8).
pub const SPAWN_BATCH: u32 = 5;

/// Average-energy-ratio thresholds for the organic-growth stage's
/// above-minimum spawning (spec.md §4.1 step 8: "≥70% → +1, ≥85% → +2").
pub const ORGANIC_GROWTH_HIGH_ENERGY_RATIO: f64 = 0.70;
pub const ORGANIC_GROWTH_VERY_HIGH_ENERGY_RATIO: f64 = 0.85;

/// Hard cap on live predators, independent of `max_entities` (spec.md §4.1
/// step 4 names a "cap" without a value).
pub const MAX_PREDATORS: u32 = 10;

/// Extra per-tick energy drain an infected entity pays on top of its base
/// metabolism rate.
pub const VIRUS_DRAIN_RATE: f64 = 0.5;

/// Energy value of a freshly spawned resource.
pub const RESOURCE_ENERGY: f64 = 50.0;

/// Resources spawned at world startup.
pub const INITIAL_RESOURCES: u32 = 100;

/// Default resource respawn rate (resources per tick; spec.md §4.1 step 9).
pub const RESOURCE_RESPAWN_RATE: f64 = 0.5;
