// SPDX-License-Identifier: MIT

use super::*;

fn sample_record() -> MutationRecord {
    MutationRecord {
        mutation_id: MutationId::new(),
        plan_id: "plan-1".to_string(),
        cycle_id: "cyc-1".to_string(),
        trait_name: "resource_diversifier".to_string(),
        version: 1,
        source_hash: "abc123".to_string(),
        file_path: "./mutations/resource_diversifier_v1.py".to_string(),
        status: MutationStatus::Queued,
        failure_reason: None,
        validation_log: Vec::new(),
    }
}

#[test]
fn happy_path_reaches_activated() {
    let mut record = sample_record();
    record.transition(MutationStatus::Validating).unwrap();
    record.transition(MutationStatus::SandboxOk).unwrap();
    record.transition(MutationStatus::Activated).unwrap();
    assert_eq!(record.status, MutationStatus::Activated);
}

#[test]
fn activated_can_roll_back() {
    let mut record = sample_record();
    record.transition(MutationStatus::Validating).unwrap();
    record.transition(MutationStatus::SandboxOk).unwrap();
    record.transition(MutationStatus::Activated).unwrap();
    record.transition(MutationStatus::RolledBack).unwrap();
    assert_eq!(record.status, MutationStatus::RolledBack);
}

#[test]
fn validating_can_be_rejected_or_failed() {
    let mut rejected = sample_record();
    rejected.transition(MutationStatus::Validating).unwrap();
    rejected.transition(MutationStatus::Rejected).unwrap();
    assert_eq!(rejected.status, MutationStatus::Rejected);

    let mut failed = sample_record();
    failed.transition(MutationStatus::Validating).unwrap();
    failed.transition(MutationStatus::Failed).unwrap();
    assert_eq!(failed.status, MutationStatus::Failed);
}

#[test]
fn rejected_is_terminal() {
    let mut record = sample_record();
    record.transition(MutationStatus::Validating).unwrap();
    record.transition(MutationStatus::Rejected).unwrap();
    assert!(record.transition(MutationStatus::Activated).is_err());
    assert!(record.transition(MutationStatus::Validating).is_err());
    assert_eq!(record.status, MutationStatus::Rejected);
}

#[test]
fn rolled_back_is_terminal() {
    let mut record = sample_record();
    record.transition(MutationStatus::Validating).unwrap();
    record.transition(MutationStatus::SandboxOk).unwrap();
    record.transition(MutationStatus::Activated).unwrap();
    record.transition(MutationStatus::RolledBack).unwrap();
    assert!(record.transition(MutationStatus::Activated).is_err());
}

#[test]
fn cannot_skip_validating() {
    let mut record = sample_record();
    assert!(record.transition(MutationStatus::SandboxOk).is_err());
    assert!(record.transition(MutationStatus::Activated).is_err());
    assert_eq!(record.status, MutationStatus::Queued);
}

#[test]
fn cannot_move_backwards() {
    let mut record = sample_record();
    record.transition(MutationStatus::Validating).unwrap();
    record.transition(MutationStatus::SandboxOk).unwrap();
    assert!(record.transition(MutationStatus::Queued).is_err());
    assert!(record.transition(MutationStatus::Validating).is_err());
}

#[test]
fn reason_code_display_matches_screaming_snake_case() {
    assert_eq!(ReasonCode::AstBannedCall.to_string(), "AST_BANNED_CALL");
}
