// SPDX-License-Identifier: MIT

//! Pure anomaly detection and fitness-regression math (spec.md §4.7 steps
//! 2-3), split out from [`crate::watcher`] so the thresholds can be
//! property-tested without a bus or a clock.

use mp_core::{Config, WorldSnapshot};

/// The reference molbot `max_energy` the starvation check is relative to.
/// Mirrors `mp-sim`'s molbot spawn constant; `mp-evolution` only ever sees
/// aggregate snapshots, never a live entity, so it can't read the value
/// back off the world directly.
pub const TYPICAL_MAX_ENERGY: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

mp_core::simple_display! {
    Severity {
        Low => "low",
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemType {
    Starvation,
    Extinction,
    Overpopulation,
}

mp_core::simple_display! {
    ProblemType {
        Starvation => "starvation",
        Extinction => "extinction",
        Overpopulation => "overpopulation",
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anomaly {
    pub problem_type: ProblemType,
    pub severity: Severity,
}

/// A pure function of a snapshot and config (spec.md §4.7 step 3). Order
/// in the returned vector is not significant; callers pick the most severe
/// with [`most_severe`].
pub fn detect_anomalies(snapshot: &WorldSnapshot, config: &Config) -> Vec<Anomaly> {
    let mut anomalies = Vec::new();

    let starvation_threshold = 0.2 * TYPICAL_MAX_ENERGY;
    if snapshot.avg_energy < starvation_threshold {
        let severity = if snapshot.avg_energy < starvation_threshold / 2.0 {
            Severity::Critical
        } else {
            Severity::High
        };
        anomalies.push(Anomaly { problem_type: ProblemType::Starvation, severity });
    }

    let extinction_threshold = config.min_population as f64 * 1.5;
    if (snapshot.entity_count as f64) < extinction_threshold {
        let severity = if snapshot.entity_count <= config.min_population as u64 {
            Severity::Critical
        } else {
            Severity::High
        };
        anomalies.push(Anomaly { problem_type: ProblemType::Extinction, severity });
    }

    let overpopulation_threshold = config.max_entities as f64 * 0.95;
    if (snapshot.entity_count as f64) > overpopulation_threshold {
        let severity = if snapshot.entity_count >= config.max_entities as u64 {
            Severity::Critical
        } else {
            Severity::High
        };
        anomalies.push(Anomaly { problem_type: ProblemType::Overpopulation, severity });
    }

    anomalies
}

/// Pick the most severe anomaly (spec.md §4.7 step 5 "order critical >
/// high > medium > low"). On a tie, `max_by_key` keeps the last maximum
/// encountered, so the later anomaly in input order wins.
pub fn most_severe(anomalies: &[Anomaly]) -> Option<Anomaly> {
    anomalies.iter().copied().max_by_key(|a| a.severity)
}

/// Relative population change since a fitness baseline (spec.md §4.7 step
/// 2): `Δ = (now - baseline) / baseline`. Returns `0.0` for a zero
/// baseline rather than dividing by zero; a baseline of zero can only mean
/// the population was already extinct, which the extinction check already
/// escalates.
pub fn fitness_delta(baseline_count: u64, current_count: u64) -> f64 {
    if baseline_count == 0 {
        return 0.0;
    }
    (current_count as f64 - baseline_count as f64) / baseline_count as f64
}

/// Has the fitness check's rollback threshold been crossed (spec.md §4.7
/// step 2 "Δ < −θ")?
pub fn is_fitness_regression(delta: f64, threshold: f64) -> bool {
    delta < -threshold
}

#[cfg(test)]
#[path = "anomaly_tests.rs"]
mod tests;
