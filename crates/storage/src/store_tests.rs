// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use dispatch_core::{
    Agent, Constraints, ContextLevel, Dispatch, DispatchId, DispatchStatus, Event, TenantId,
    WorkspaceMode,
};
use tempfile::tempdir;

fn sample_dispatch(id: &str) -> Dispatch {
    Dispatch::new_pending(
        DispatchId::new(id),
        TenantId::new("t1"),
        None,
        Agent::Codex,
        "codex-flagship-1".into(),
        "echo hi".into(),
        None,
        None,
        ContextLevel::Standard,
        WorkspaceMode::None,
        60,
        Constraints::default(),
        Default::default(),
        Default::default(),
        1_000,
    )
}

#[test]
fn open_on_empty_dir_starts_fresh() {
    let dir = tempdir().unwrap();
    let storage = Storage::open(dir.path()).unwrap();
    let guard = storage.inner.lock();
    assert!(guard.state.dispatches.is_empty());
    assert_eq!(guard.wal.processed_seq(), 0);
}

#[test]
fn append_and_apply_persists_across_reopen() {
    let dir = tempdir().unwrap();
    {
        let storage = Storage::open(dir.path()).unwrap();
        storage
            .append_and_apply(Event::DispatchCreated {
                dispatch: Box::new(sample_dispatch("d1")),
            })
            .unwrap();
    }

    let reopened = Storage::open(dir.path()).unwrap();
    let guard = reopened.inner.lock();
    assert_eq!(guard.state.dispatches.len(), 1);
    assert!(guard.state.dispatches.contains_key(&DispatchId::new("d1")));
}

#[test]
fn checkpoint_truncates_wal_but_preserves_state_on_reopen() {
    let dir = tempdir().unwrap();
    let storage = Storage::open(dir.path()).unwrap();
    storage
        .append_and_apply(Event::DispatchCreated {
            dispatch: Box::new(sample_dispatch("d1")),
        })
        .unwrap();
    storage
        .append_and_apply(Event::DispatchStatusChanged {
            dispatch_id: DispatchId::new("d1"),
            expected_version: 1,
            next: DispatchStatus::Provisioning,
            now_ms: 2_000,
            runtime_handle: None,
            exit_code: None,
            error_kind: None,
            error_message: None,
        })
        .unwrap();
    storage.checkpoint().unwrap();

    assert!(dir.path().join("snapshot.zst").exists());
    {
        let guard = storage.inner.lock();
        // truncate_before keeps the boundary entry itself, so at most one
        // line should remain ahead of a full WAL holding two writes.
        assert!(guard.wal.entries_after(0).unwrap().len() <= 1);
    }

    let reopened = Storage::open(dir.path()).unwrap();
    let guard = reopened.inner.lock();
    let dispatch = guard.state.dispatches.get(&DispatchId::new("d1")).unwrap();
    assert_eq!(dispatch.status, DispatchStatus::Provisioning);
    assert_eq!(dispatch.version, 2);
}
