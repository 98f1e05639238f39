// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized state derived from WAL replay (§4.2, §4.3, §4.4, §6.6).

use dispatch_core::{DispatchId, Event, IdempotencyRecord, PoolSlot, SlotId, TenantId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Everything the repository/store traits read and write, rebuilt from the
/// WAL (plus a snapshot) on startup. All fields are keyed for the lookups
/// §4.2/§4.3/§4.4 require; `queryBy*` filters scan `dispatches` directly
/// since §9/OQ3 does not mandate a dedicated tag index.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct MaterializedState {
    pub dispatches: HashMap<DispatchId, dispatch_core::Dispatch>,
    pub pool_slots: HashMap<SlotId, PoolSlot>,
    /// `(tenantId, idempotencyKey)` -> record.
    pub idempotency: HashMap<(TenantId, String), IdempotencyRecord>,
}

impl MaterializedState {
    /// Apply a durable fact. Handlers are idempotent: replaying the same
    /// event twice (crash recovery, duplicate WAL read) must leave state
    /// unchanged the second time.
    pub fn apply_event(&mut self, event: &Event) {
        match event {
            Event::DispatchCreated { dispatch } => {
                self.dispatches
                    .entry(dispatch.dispatch_id.clone())
                    .or_insert_with(|| (**dispatch).clone());
            }

            Event::DispatchStatusChanged {
                dispatch_id,
                expected_version,
                next,
                now_ms,
                runtime_handle,
                exit_code,
                error_kind,
                error_message,
            } => {
                if let Some(d) = self.dispatches.get_mut(dispatch_id) {
                    // Idempotent replay guard: only apply if the version this
                    // event was conditioned on is still current.
                    if d.version != *expected_version {
                        return;
                    }
                    if d.transition(*next, *now_ms).is_err() {
                        return;
                    }
                    if let Some(handle) = runtime_handle {
                        d.runtime_handle = Some(handle.clone());
                    }
                    if let Some(code) = exit_code {
                        d.exit_code = Some(*code);
                    }
                    if let Some(kind) = error_kind {
                        d.error_kind = Some(kind.clone());
                    }
                    if let Some(msg) = error_message {
                        d.error_message = Some(msg.clone());
                    }
                }
            }

            Event::DispatchArtifactSet {
                dispatch_id,
                artifact_handle,
            } => {
                if let Some(d) = self.dispatches.get_mut(dispatch_id) {
                    d.artifact_handle = Some(artifact_handle.clone());
                }
            }

            Event::IdempotencyClaimed { record } => {
                let key = (TenantId::new(record.tenant_id.clone()), record.idempotency_key.clone());
                let stale = self
                    .idempotency
                    .get(&key)
                    .is_none_or(|existing| existing.is_expired(record.created_at_ms));
                if stale {
                    self.idempotency.insert(key, record.clone());
                }
            }

            Event::PoolSlotCreated { slot } => {
                self.pool_slots
                    .entry(slot.slot_id.clone())
                    .or_insert_with(|| slot.clone());
            }

            Event::PoolSlotStateChanged {
                slot_id,
                state,
                now_ms,
                acquired_by,
            } => {
                if let Some(slot) = self.pool_slots.get_mut(slot_id) {
                    slot.state = *state;
                    slot.acquired_by = acquired_by.clone();
                    if *state == dispatch_core::SlotState::Warm {
                        slot.last_healthy_at_ms = *now_ms;
                    }
                }
            }

            Event::PoolSlotRemoved { slot_id } => {
                self.pool_slots.remove(slot_id);
            }
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
