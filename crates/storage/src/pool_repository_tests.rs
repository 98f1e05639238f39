// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::store::Storage;
use dispatch_core::{DispatchId, PoolSlot};
use tempfile::tempdir;

fn storage() -> Storage {
    let dir = tempdir().unwrap();
    let path = dir.path().to_path_buf();
    std::mem::forget(dir);
    Storage::open(&path).unwrap()
}

fn warm_slot(id: &str, created_at_ms: u64) -> PoolSlot {
    PoolSlot {
        slot_id: SlotId::new(id),
        agent: Agent::Codex,
        state: SlotState::Warm,
        acquired_by: None,
        created_at_ms,
        last_healthy_at_ms: created_at_ms,
        ttl_ms: created_at_ms + 600_000,
    }
}

#[tokio::test]
async fn create_slot_then_get_round_trips() {
    let storage = storage();
    storage.create_slot(warm_slot("s1", 1_000)).await.unwrap();
    let fetched = storage.get(&SlotId::new("s1")).await.unwrap();
    assert_eq!(fetched.state, SlotState::Warm);
}

#[tokio::test]
async fn create_duplicate_slot_is_rejected() {
    let storage = storage();
    storage.create_slot(warm_slot("s1", 1_000)).await.unwrap();
    let err = storage.create_slot(warm_slot("s1", 1_000)).await.unwrap_err();
    assert!(matches!(err, StorageError::Duplicate(_)));
}

#[tokio::test]
async fn acquire_oldest_warm_picks_lowest_created_at_and_marks_acquired() {
    let storage = storage();
    storage.create_slot(warm_slot("newer", 2_000)).await.unwrap();
    storage.create_slot(warm_slot("older", 1_000)).await.unwrap();

    let acquired = storage
        .acquire_oldest_warm(Agent::Codex, DispatchId::new("d1"), 3_000)
        .await
        .unwrap();
    assert_eq!(acquired, Some(SlotId::new("older")));

    let slot = storage.get(&SlotId::new("older")).await.unwrap();
    assert_eq!(slot.state, SlotState::Acquired);
    assert_eq!(slot.acquired_by, Some(DispatchId::new("d1")));
}

#[tokio::test]
async fn acquire_oldest_warm_returns_none_when_empty() {
    let storage = storage();
    let acquired = storage
        .acquire_oldest_warm(Agent::Claude, DispatchId::new("d1"), 1_000)
        .await
        .unwrap();
    assert!(acquired.is_none());
}

#[tokio::test]
async fn count_by_filters_agent_and_states() {
    let storage = storage();
    storage.create_slot(warm_slot("s1", 1_000)).await.unwrap();
    storage.create_slot(warm_slot("s2", 1_000)).await.unwrap();
    storage
        .transition(&SlotId::new("s2"), SlotState::Acquired, 2_000, None)
        .await
        .unwrap();

    assert_eq!(
        storage.count_by(Agent::Codex, &[SlotState::Warm]).await,
        1
    );
    assert_eq!(
        storage
            .count_by(Agent::Codex, &[SlotState::Warm, SlotState::Acquired])
            .await,
        2
    );
    assert_eq!(storage.count_by(Agent::Claude, &[SlotState::Warm]).await, 0);
}

#[tokio::test]
async fn transition_on_missing_slot_is_not_found() {
    let storage = storage();
    let err = storage
        .transition(&SlotId::new("missing"), SlotState::Releasing, 1_000, None)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn remove_drops_slot_from_listing() {
    let storage = storage();
    storage.create_slot(warm_slot("s1", 1_000)).await.unwrap();
    storage.remove(&SlotId::new("s1")).await.unwrap();
    assert!(storage.list_by_agent(Agent::Codex).await.is_empty());
}
