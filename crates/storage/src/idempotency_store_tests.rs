// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::store::Storage;
use tempfile::tempdir;

fn storage() -> Storage {
    let dir = tempdir().unwrap();
    let path = dir.path().to_path_buf();
    std::mem::forget(dir);
    Storage::open(&path).unwrap()
}

#[tokio::test]
async fn claim_then_lookup_resolves_to_dispatch() {
    let storage = storage();
    let tenant = TenantId::new("t1");
    storage
        .claim(&tenant, "key-1", DispatchId::new("d1"), 1_000, 86_400_000)
        .await
        .unwrap();

    assert_eq!(
        storage.lookup(&tenant, "key-1").await,
        Some(DispatchId::new("d1"))
    );
}

#[tokio::test]
async fn second_claim_with_same_key_is_rejected_while_live() {
    let storage = storage();
    let tenant = TenantId::new("t1");
    storage
        .claim(&tenant, "key-1", DispatchId::new("d1"), 1_000, 86_400_000)
        .await
        .unwrap();

    let err = storage
        .claim(&tenant, "key-1", DispatchId::new("d2"), 2_000, 86_400_000)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StorageError::AlreadyClaimed { dispatch_id } if dispatch_id == DispatchId::new("d1")
    ));
}

#[tokio::test]
async fn claim_after_ttl_expiry_succeeds_with_new_dispatch() {
    let storage = storage();
    let tenant = TenantId::new("t1");
    storage.claim(&tenant, "key-1", DispatchId::new("d1"), 1_000, 500).await.unwrap();

    storage
        .claim(&tenant, "key-1", DispatchId::new("d2"), 10_000, 86_400_000)
        .await
        .unwrap();
    assert_eq!(
        storage.lookup(&tenant, "key-1").await,
        Some(DispatchId::new("d2"))
    );
}

#[tokio::test]
async fn lookup_missing_key_returns_none() {
    let storage = storage();
    assert!(storage.lookup(&TenantId::new("t1"), "missing").await.is_none());
}

#[tokio::test]
async fn claim_is_scoped_per_tenant() {
    let storage = storage();
    storage
        .claim(&TenantId::new("t1"), "key-1", DispatchId::new("d1"), 1_000, 86_400_000)
        .await
        .unwrap();
    storage
        .claim(&TenantId::new("t2"), "key-1", DispatchId::new("d2"), 1_000, 86_400_000)
        .await
        .unwrap();

    assert_eq!(
        storage.lookup(&TenantId::new("t1"), "key-1").await,
        Some(DispatchId::new("d1"))
    );
    assert_eq!(
        storage.lookup(&TenantId::new("t2"), "key-1").await,
        Some(DispatchId::new("d2"))
    );
}
