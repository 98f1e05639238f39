// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::artifact::ArtifactPublisher;
use crate::launcher::{AgentCatalog, TaskLauncher};
use crate::pool::{PoolConfig, WarmPool};
use crate::workspace::WorkspaceHandler;
use dispatch_adapters::{FakeContainerRuntime, InMemoryBlobStore, RuntimeDescription};
use dispatch_core::{Agent, Constraints, ContextLevel, Dispatch, DispatchId, WorkspaceMode};
use dispatch_storage::Storage;
use std::collections::HashMap;

fn storage() -> Storage {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().to_path_buf();
    std::mem::forget(dir);
    Storage::open(&path).unwrap()
}

fn sweeper(storage: Storage, runtime: FakeContainerRuntime) -> ZombieSweeper {
    let launcher = Arc::new(TaskLauncher::new(AgentCatalog::with_defaults(), WorkspaceHandler::new()));
    let pool = Arc::new(WarmPool::new(
        Arc::new(storage.clone()),
        Arc::new(runtime.clone()),
        launcher,
        HashMap::<Agent, PoolConfig>::new(),
    ));
    let artifacts = Arc::new(ArtifactPublisher::new(Arc::new(InMemoryBlobStore::new())));
    let reconciler = Arc::new(StatusReconciler::new(Arc::new(storage.clone()), pool, artifacts));
    ZombieSweeper::new(Arc::new(storage), Arc::new(runtime), reconciler)
}

async fn seed(storage: &Storage, id: &str, runtime_handle: Option<&str>, created_at_ms: u64) -> Dispatch {
    let d = Dispatch::new_pending(
        DispatchId::new(id),
        dispatch_core::TenantId::new("t1"),
        None,
        Agent::Aider,
        "aider-flagship-1".to_string(),
        "echo hi".to_string(),
        None,
        None,
        ContextLevel::Standard,
        WorkspaceMode::None,
        60,
        Constraints::default(),
        HashMap::new(),
        HashMap::new(),
        created_at_ms,
    );
    DispatchRepository::create(storage, d.clone()).await.unwrap();
    if let Some(handle) = runtime_handle {
        DispatchRepository::update_status(
            storage,
            &d.dispatch_id,
            1,
            DispatchStatus::Provisioning,
            created_at_ms,
            StatusPatch {
                runtime_handle: Some(handle.to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        DispatchRepository::update_status(
            storage,
            &d.dispatch_id,
            2,
            DispatchStatus::Running,
            created_at_ms,
            StatusPatch::default(),
        )
        .await
        .unwrap()
    } else {
        d
    }
}

#[tokio::test]
async fn stale_running_dispatch_with_stopped_runtime_reaches_success() {
    let storage = storage();
    seed(&storage, "d1", Some("ctr-1"), 0).await;
    let runtime = FakeContainerRuntime::new();
    runtime.set_state(
        "ctr-1",
        RuntimeDescription {
            state: dispatch_adapters::RuntimeState::Stopped,
            exit_code: Some(0),
            stopped_at_ms: Some(500),
        },
    );
    let sweeper = sweeper(storage.clone(), runtime);

    let swept = sweeper.sweep(200 * 60 * 1000).await.unwrap();
    assert_eq!(swept, 1);

    let dispatch = DispatchRepository::get_by_id(&storage, &DispatchId::new("d1")).await.unwrap();
    assert_eq!(dispatch.status, DispatchStatus::Success);
}

#[tokio::test]
async fn stale_running_dispatch_with_unknown_runtime_is_marked_runtime_lost() {
    let storage = storage();
    seed(&storage, "d1", Some("ctr-1"), 0).await;
    let runtime = FakeContainerRuntime::new();
    // No set_state call: describe() returns NotFound for "ctr-1".
    let sweeper = sweeper(storage.clone(), runtime);

    sweeper.sweep(200 * 60 * 1000).await.unwrap();

    let dispatch = DispatchRepository::get_by_id(&storage, &DispatchId::new("d1")).await.unwrap();
    assert_eq!(dispatch.status, DispatchStatus::Timeout);
    assert_eq!(dispatch.error_kind.as_deref(), Some("RUNTIME_LOST"));
}

#[tokio::test]
async fn running_dispatch_within_deadline_is_left_alone() {
    let storage = storage();
    seed(&storage, "d1", Some("ctr-1"), 1_000).await;
    let runtime = FakeContainerRuntime::new();
    let sweeper = sweeper(storage.clone(), runtime);

    let swept = sweeper.sweep(1_500).await.unwrap();
    assert_eq!(swept, 0);

    let dispatch = DispatchRepository::get_by_id(&storage, &DispatchId::new("d1")).await.unwrap();
    assert_eq!(dispatch.status, DispatchStatus::Running);
}

#[tokio::test]
async fn stale_pending_dispatch_with_no_runtime_handle_is_marked_runtime_lost() {
    let storage = storage();
    seed(&storage, "d1", None, 0).await;
    let runtime = FakeContainerRuntime::new();
    let sweeper = sweeper(storage.clone(), runtime);

    let swept = sweeper.sweep(10 * 60 * 1000).await.unwrap();
    assert_eq!(swept, 1);

    let dispatch = DispatchRepository::get_by_id(&storage, &DispatchId::new("d1")).await.unwrap();
    assert_eq!(dispatch.status, DispatchStatus::Timeout);
    assert_eq!(dispatch.error_kind.as_deref(), Some("RUNTIME_LOST"));
}
