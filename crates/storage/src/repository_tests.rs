// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::store::Storage;
use dispatch_core::{Agent, Constraints, ContextLevel, Dispatch, DispatchId, TenantId, WorkspaceMode};
use tempfile::tempdir;

fn sample_dispatch(id: &str, tenant: &str, created_at_ms: u64) -> Dispatch {
    Dispatch::new_pending(
        DispatchId::new(id),
        TenantId::new(tenant),
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
        created_at_ms,
    )
}

fn storage() -> Storage {
    let dir = tempdir().unwrap();
    let path = dir.path().to_path_buf();
    // Leaked on purpose: TempDir's Drop would remove the directory while
    // Storage still references it by path.
    std::mem::forget(dir);
    Storage::open(&path).unwrap()
}

#[tokio::test]
async fn create_then_get_round_trips() {
    let storage = storage();
    storage.create(sample_dispatch("d1", "t1", 1_000)).await.unwrap();
    let fetched = storage.get_by_id(&DispatchId::new("d1")).await.unwrap();
    assert_eq!(fetched.tenant_id, TenantId::new("t1"));
}

#[tokio::test]
async fn create_duplicate_is_rejected() {
    let storage = storage();
    storage.create(sample_dispatch("d1", "t1", 1_000)).await.unwrap();
    let err = storage
        .create(sample_dispatch("d1", "t1", 1_000))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Duplicate(_)));
}

#[tokio::test]
async fn get_missing_is_not_found() {
    let storage = storage();
    let err = storage.get_by_id(&DispatchId::new("missing")).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn update_status_with_correct_version_succeeds_and_bumps_version() {
    let storage = storage();
    storage.create(sample_dispatch("d1", "t1", 1_000)).await.unwrap();
    let updated = storage
        .update_status(
            &DispatchId::new("d1"),
            1,
            DispatchStatus::Provisioning,
            2_000,
            StatusPatch::default(),
        )
        .await
        .unwrap();
    assert_eq!(updated.status, DispatchStatus::Provisioning);
    assert_eq!(updated.version, 2);
}

#[tokio::test]
async fn update_status_with_stale_version_is_rejected() {
    let storage = storage();
    storage.create(sample_dispatch("d1", "t1", 1_000)).await.unwrap();
    let err = storage
        .update_status(
            &DispatchId::new("d1"),
            99,
            DispatchStatus::Provisioning,
            2_000,
            StatusPatch::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StorageError::StaleVersion {
            expected: 99,
            found: 1
        }
    ));
}

#[tokio::test]
async fn set_artifact_handle_requires_existing_dispatch() {
    let storage = storage();
    let err = storage
        .set_artifact_handle(&DispatchId::new("missing"), "blob://x".into())
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));

    storage.create(sample_dispatch("d1", "t1", 1_000)).await.unwrap();
    storage
        .set_artifact_handle(&DispatchId::new("d1"), "blob://x".into())
        .await
        .unwrap();
    let fetched = storage.get_by_id(&DispatchId::new("d1")).await.unwrap();
    assert_eq!(fetched.artifact_handle.as_deref(), Some("blob://x"));
}

#[tokio::test]
async fn query_by_tenant_paginates_newest_first() {
    let storage = storage();
    for (id, ts) in [("d1", 1_000u64), ("d2", 2_000), ("d3", 3_000)] {
        storage.create(sample_dispatch(id, "t1", ts)).await.unwrap();
    }
    storage.create(sample_dispatch("other", "t2", 4_000)).await.unwrap();

    let page1 = storage
        .query_by_tenant(&TenantId::new("t1"), None, 2)
        .await
        .unwrap();
    assert_eq!(page1.items.len(), 2);
    assert_eq!(page1.items[0].dispatch_id, DispatchId::new("d3"));
    assert_eq!(page1.items[1].dispatch_id, DispatchId::new("d2"));
    assert!(page1.next_cursor.is_some());

    let page2 = storage
        .query_by_tenant(&TenantId::new("t1"), page1.next_cursor, 2)
        .await
        .unwrap();
    assert_eq!(page2.items.len(), 1);
    assert_eq!(page2.items[0].dispatch_id, DispatchId::new("d1"));
    assert!(page2.next_cursor.is_none());
}

#[tokio::test]
async fn query_by_status_filters_on_age() {
    let storage = storage();
    storage.create(sample_dispatch("d1", "t1", 1_000)).await.unwrap();
    let results = storage
        .query_by_status(DispatchStatus::Pending, 5_000)
        .await
        .unwrap();
    assert_eq!(results.len(), 1);

    let none = storage
        .query_by_status(DispatchStatus::Pending, 500)
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn query_by_runtime_handle_matches_exact_handle() {
    let storage = storage();
    storage.create(sample_dispatch("d1", "t1", 1_000)).await.unwrap();
    storage
        .update_status(
            &DispatchId::new("d1"),
            1,
            DispatchStatus::Provisioning,
            2_000,
            StatusPatch {
                runtime_handle: Some("ctr-123".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let found = storage.query_by_runtime_handle("ctr-123").await.unwrap();
    assert_eq!(found.len(), 1);
    assert!(storage.query_by_runtime_handle("ctr-999").await.unwrap().is_empty());
}

#[tokio::test]
async fn query_by_tags_requires_all_given_tags_to_match() {
    let storage = storage();
    let mut d1 = sample_dispatch("d1", "t1", 1_000);
    d1.tags.insert("env".into(), "prod".into());
    d1.tags.insert("team".into(), "infra".into());
    let mut d2 = sample_dispatch("d2", "t1", 1_000);
    d2.tags.insert("env".into(), "prod".into());
    storage.create(d1).await.unwrap();
    storage.create(d2).await.unwrap();

    let mut want = std::collections::HashMap::new();
    want.insert("env".to_string(), "prod".to_string());
    want.insert("team".to_string(), "infra".to_string());
    let found = storage.query_by_tags(&want, 10).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].dispatch_id, DispatchId::new("d1"));
}
