// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn new_cycle_starts_in_planning() {
    let cycle = EvolutionCycle::new(TriggerReason::Anomaly, 100);
    assert_eq!(cycle.stage, CycleStage::Planning);
    assert!(!cycle.is_terminal());
}

#[test]
fn happy_path_reaches_done() {
    let mut cycle = EvolutionCycle::new(TriggerReason::Periodic, 1);
    cycle.advance(CycleStage::Coding).unwrap();
    cycle.advance(CycleStage::Patching).unwrap();
    cycle.advance(CycleStage::Done).unwrap();
    assert!(cycle.is_terminal());
}

#[test]
fn any_non_terminal_stage_can_fail() {
    for start in [CycleStage::Planning, CycleStage::Coding, CycleStage::Patching] {
        let mut cycle = EvolutionCycle::new(TriggerReason::Manual, 1);
        cycle.stage = start;
        cycle.advance(CycleStage::Failed).unwrap();
        assert_eq!(cycle.stage, CycleStage::Failed);
    }
}

#[test]
fn terminal_stages_reject_further_transitions() {
    let mut done = EvolutionCycle::new(TriggerReason::Manual, 1);
    done.stage = CycleStage::Done;
    assert!(done.advance(CycleStage::Coding).is_err());

    let mut failed = EvolutionCycle::new(TriggerReason::Manual, 1);
    failed.stage = CycleStage::Failed;
    assert!(failed.advance(CycleStage::Planning).is_err());
}

#[test]
fn cannot_skip_stages() {
    let mut cycle = EvolutionCycle::new(TriggerReason::FitnessRollback, 1);
    assert!(cycle.advance(CycleStage::Patching).is_err());
    assert!(cycle.advance(CycleStage::Done).is_err());
    assert_eq!(cycle.stage, CycleStage::Planning);
}
