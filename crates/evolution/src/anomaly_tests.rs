// SPDX-License-Identifier: MIT

use std::collections::HashMap;

use yare::parameterized;

use super::*;

fn snapshot(entity_count: u64, avg_energy: f64) -> WorldSnapshot {
    WorldSnapshot {
        tick: 1,
        entity_count,
        avg_energy,
        resource_count: 10,
        death_stats: HashMap::new(),
        timestamp_epoch_ms: 0,
    }
}

fn config() -> Config {
    Config { min_population: 20, max_entities: 500, ..Config::default() }
}

#[parameterized(
    healthy = { 100, 40.0, &[] },
    starvation_high = { 100, 15.0, &[(ProblemType::Starvation, Severity::High)] },
    starvation_critical = { 100, 5.0, &[(ProblemType::Starvation, Severity::Critical)] },
    extinction_high = { 25, 40.0, &[(ProblemType::Extinction, Severity::High)] },
    extinction_critical = { 20, 40.0, &[(ProblemType::Extinction, Severity::Critical)] },
    overpopulation_high = { 480, 40.0, &[(ProblemType::Overpopulation, Severity::High)] },
    overpopulation_critical = { 500, 40.0, &[(ProblemType::Overpopulation, Severity::Critical)] },
)]
fn detects_expected_anomalies(entity_count: u64, avg_energy: f64, expected: &[(ProblemType, Severity)]) {
    let snapshot = snapshot(entity_count, avg_energy);
    let anomalies = detect_anomalies(&snapshot, &config());
    assert_eq!(anomalies.len(), expected.len());
    for (problem_type, severity) in expected {
        assert!(anomalies.iter().any(|a| a.problem_type == *problem_type && a.severity == *severity));
    }
}

#[test]
fn most_severe_prefers_critical_over_high() {
    let anomalies = vec![
        Anomaly { problem_type: ProblemType::Starvation, severity: Severity::High },
        Anomaly { problem_type: ProblemType::Extinction, severity: Severity::Critical },
    ];
    let chosen = most_severe(&anomalies).unwrap();
    assert_eq!(chosen.problem_type, ProblemType::Extinction);
    assert_eq!(chosen.severity, Severity::Critical);
}

#[test]
fn most_severe_of_empty_is_none() {
    assert!(most_severe(&[]).is_none());
}

#[test]
fn fitness_delta_matches_scenario_5() {
    let delta = fitness_delta(100, 70);
    assert!((delta - (-0.30)).abs() < 1e-9);
    assert!(is_fitness_regression(delta, 0.15));
}

#[test]
fn fitness_delta_within_threshold_is_not_a_regression() {
    let delta = fitness_delta(100, 90);
    assert!(!is_fitness_regression(delta, 0.15));
}

#[test]
fn fitness_delta_of_zero_baseline_is_zero() {
    assert_eq!(fitness_delta(0, 50), 0.0);
}
