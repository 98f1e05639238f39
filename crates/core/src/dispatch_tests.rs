// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;

fn sample() -> Dispatch {
    Dispatch::new_pending(
        DispatchId::new("d1"),
        TenantId::new("t1"),
        None,
        Agent::Aider,
        "aider-flagship-1".into(),
        "echo hi".into(),
        None,
        None,
        ContextLevel::Standard,
        WorkspaceMode::None,
        60,
        Constraints::default(),
        HashMap::new(),
        HashMap::new(),
        1_000,
    )
}

#[test]
fn new_pending_starts_at_version_one_with_no_end() {
    let d = sample();
    assert_eq!(d.status, DispatchStatus::Pending);
    assert_eq!(d.version, 1);
    assert!(d.ended_at_ms.is_none());
    assert!(d.started_at_ms.is_none());
}

#[test]
fn full_happy_path_transition_sequence() {
    let mut d = sample();
    d.transition(DispatchStatus::Provisioning, 1_100).unwrap();
    assert_eq!(d.version, 2);
    assert_eq!(d.started_at_ms, Some(1_100));
    d.transition(DispatchStatus::Running, 1_200).unwrap();
    d.transition(DispatchStatus::Completing, 1_300).unwrap();
    d.transition(DispatchStatus::Success, 1_400).unwrap();
    assert_eq!(d.version, 5);
    assert!(d.status.is_terminal());
    assert_eq!(d.ended_at_ms, Some(1_400));
}

#[test]
fn terminal_state_rejects_any_further_transition() {
    let mut d = sample();
    d.transition(DispatchStatus::Cancelled, 2_000).unwrap();
    let err = d.transition(DispatchStatus::Running, 2_100).unwrap_err();
    assert_eq!(err.from, DispatchStatus::Cancelled);
    assert_eq!(err.to, DispatchStatus::Running);
    // Record is frozen: version does not advance on the rejected attempt.
    assert_eq!(d.version, 2);
}

#[test]
fn pending_cannot_skip_directly_to_running() {
    let mut d = sample();
    assert!(d.transition(DispatchStatus::Running, 1_000).is_err());
}

#[test]
fn completing_can_only_reach_success_or_failed() {
    assert!(DispatchStatus::Completing.can_transition_to(DispatchStatus::Success));
    assert!(DispatchStatus::Completing.can_transition_to(DispatchStatus::Failed));
    assert!(!DispatchStatus::Completing.can_transition_to(DispatchStatus::Cancelled));
    assert!(!DispatchStatus::Completing.can_transition_to(DispatchStatus::Timeout));
}

#[test]
fn ended_at_set_iff_terminal() {
    let mut d = sample();
    for (next, now) in [
        (DispatchStatus::Provisioning, 10),
        (DispatchStatus::Running, 20),
    ] {
        d.transition(next, now).unwrap();
        assert!(d.ended_at_ms.is_none());
    }
    d.transition(DispatchStatus::Timeout, 30).unwrap();
    assert_eq!(d.ended_at_ms, Some(30));
}
