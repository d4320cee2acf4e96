// SPDX-License-Identifier: MIT

//! Scenario 6 (spec.md §8, §4.7 steps 5-6 "cooldown" / "periodic keep-
//! improving trigger"): the periodic trigger and the cooldown it shares
//! with anomaly triggers interact — firing the periodic trigger resets the
//! shared cooldown clock, suppressing an anomaly that would otherwise fire
//! immediately after, until the cooldown itself elapses.

use std::time::Duration;

use mp_core::{Event, FakeClock, TelemetryPayload};
use mp_evolution::Watcher;

use crate::support::{config, Fixture};

fn telemetry(tick: u64, entity_count: u64) -> TelemetryPayload {
    TelemetryPayload { tick, entity_count, avg_energy: 40.0, resource_count: 10, death_stats: Default::default() }
}

#[tokio::test]
async fn a_periodic_trigger_s_cooldown_suppresses_a_following_anomaly_until_it_elapses() {
    let fixture = Fixture::new();
    let mut cfg = config();
    cfg.evolution_cooldown_sec = 60;
    cfg.periodic_evolution_interval_sec = 50;
    let clock = FakeClock::new();
    let watcher = Watcher::new(fixture.bus.clone(), cfg, clock.clone());
    let mut trigger_rx = fixture.bus.subscribe("evolution_trigger");

    // A healthy population, too early for the periodic trigger to fire yet.
    watcher.on_telemetry(&telemetry(1, 200));
    assert!(trigger_rx.try_recv().is_err());

    // Past the periodic interval, still healthy: the periodic "keep
    // improving" trigger fires on its own.
    clock.advance(Duration::from_secs(51));
    watcher.on_telemetry(&telemetry(2, 200));
    let Event::EvolutionTrigger(periodic) = trigger_rx.try_recv().expect("periodic trigger fires") else {
        panic!("expected evolution_trigger event");
    };
    assert_eq!(periodic.problem_type, "periodic_improvement");

    // An extinction-level anomaly shows up immediately after, but the
    // periodic trigger just reset the shared cooldown clock, so it's
    // suppressed.
    watcher.on_telemetry(&telemetry(3, 15));
    assert!(trigger_rx.try_recv().is_err(), "anomaly trigger suppressed by the periodic trigger's cooldown");

    // Once the cooldown elapses, the same anomaly fires a trigger.
    clock.advance(Duration::from_secs(61));
    watcher.on_telemetry(&telemetry(4, 15));
    let Event::EvolutionTrigger(anomaly) = trigger_rx.try_recv().expect("anomaly trigger fires after cooldown") else {
        panic!("expected evolution_trigger event");
    };
    assert_eq!(anomaly.problem_type, "extinction");
}
