// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`PoolRepository`] (§4.4): per-agent inventory of warm pool slots.

use crate::store::Storage;
use crate::StorageError;
use async_trait::async_trait;
use dispatch_core::{Agent, DispatchId, Event, PoolSlot, SlotId, SlotState};

#[async_trait]
pub trait PoolRepository: Send + Sync {
    async fn create_slot(&self, slot: PoolSlot) -> Result<(), StorageError>;
    async fn get(&self, slot_id: &SlotId) -> Result<PoolSlot, StorageError>;
    async fn list_by_agent(&self, agent: Agent) -> Vec<PoolSlot>;
    async fn count_by(&self, agent: Agent, states: &[SlotState]) -> usize;
    /// Conditionally transition the oldest `WARM` slot for `agent` to
    /// `ACQUIRED`, keyed on it still being `WARM` (§4.4 acquire). Returns
    /// `None` if no warm slot is available (`EMPTY`).
    async fn acquire_oldest_warm(
        &self,
        agent: Agent,
        dispatch_id: DispatchId,
        now_ms: u64,
    ) -> Result<Option<SlotId>, StorageError>;
    async fn transition(
        &self,
        slot_id: &SlotId,
        next: SlotState,
        now_ms: u64,
        acquired_by: Option<DispatchId>,
    ) -> Result<(), StorageError>;
    async fn remove(&self, slot_id: &SlotId) -> Result<(), StorageError>;
}

#[async_trait]
impl PoolRepository for Storage {
    async fn create_slot(&self, slot: PoolSlot) -> Result<(), StorageError> {
        {
            let guard = self.inner.lock();
            if guard.state.pool_slots.contains_key(&slot.slot_id) {
                return Err(StorageError::Duplicate(slot.slot_id.to_string()));
            }
        }
        self.append_and_apply(Event::PoolSlotCreated { slot })
    }

    async fn get(&self, slot_id: &SlotId) -> Result<PoolSlot, StorageError> {
        let guard = self.inner.lock();
        guard
            .state
            .pool_slots
            .get(slot_id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_by_agent(&self, agent: Agent) -> Vec<PoolSlot> {
        let guard = self.inner.lock();
        guard
            .state
            .pool_slots
            .values()
            .filter(|s| s.agent == agent)
            .cloned()
            .collect()
    }

    async fn count_by(&self, agent: Agent, states: &[SlotState]) -> usize {
        let guard = self.inner.lock();
        guard
            .state
            .pool_slots
            .values()
            .filter(|s| s.agent == agent && states.contains(&s.state))
            .count()
    }

    async fn acquire_oldest_warm(
        &self,
        agent: Agent,
        dispatch_id: DispatchId,
        now_ms: u64,
    ) -> Result<Option<SlotId>, StorageError> {
        let candidate = {
            let guard = self.inner.lock();
            guard
                .state
                .pool_slots
                .values()
                .filter(|s| s.agent == agent && s.state == SlotState::Warm)
                .min_by_key(|s| s.created_at_ms)
                .map(|s| s.slot_id.clone())
        };
        let Some(slot_id) = candidate else {
            return Ok(None);
        };
        self.append_and_apply(Event::PoolSlotStateChanged {
            slot_id: slot_id.clone(),
            state: SlotState::Acquired,
            now_ms,
            acquired_by: Some(dispatch_id),
        })?;
        Ok(Some(slot_id))
    }

    async fn transition(
        &self,
        slot_id: &SlotId,
        next: SlotState,
        now_ms: u64,
        acquired_by: Option<DispatchId>,
    ) -> Result<(), StorageError> {
        {
            let guard = self.inner.lock();
            if !guard.state.pool_slots.contains_key(slot_id) {
                return Err(StorageError::NotFound);
            }
        }
        self.append_and_apply(Event::PoolSlotStateChanged {
            slot_id: slot_id.clone(),
            state: next,
            now_ms,
            acquired_by,
        })
    }

    async fn remove(&self, slot_id: &SlotId) -> Result<(), StorageError> {
        {
            let guard = self.inner.lock();
            if !guard.state.pool_slots.contains_key(slot_id) {
                return Err(StorageError::NotFound);
            }
        }
        self.append_and_apply(Event::PoolSlotRemoved {
            slot_id: slot_id.clone(),
        })
    }
}

#[cfg(test)]
#[path = "pool_repository_tests.rs"]
mod tests;
