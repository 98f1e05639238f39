// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable facts written to the write-ahead log (§10 Persistence).
//!
//! The storage layer's [`MaterializedState`](crate) replay derives all
//! queryable state from a sequence of these; nothing is mutated except
//! through an `Event`.

use crate::dispatch::{Dispatch, DispatchId, DispatchStatus};
use crate::idempotency::IdempotencyRecord;
use crate::pool::{PoolSlot, SlotId, SlotState};
use serde::{Deserialize, Serialize};

/// A durable fact about dispatch or pool state (§4.2, §4.4, §4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    DispatchCreated {
        dispatch: Box<Dispatch>,
    },
    DispatchStatusChanged {
        dispatch_id: DispatchId,
        expected_version: u64,
        next: DispatchStatus,
        now_ms: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        runtime_handle: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_kind: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_message: Option<String>,
    },
    DispatchArtifactSet {
        dispatch_id: DispatchId,
        artifact_handle: String,
    },
    IdempotencyClaimed {
        record: IdempotencyRecord,
    },
    PoolSlotCreated {
        slot: PoolSlot,
    },
    PoolSlotStateChanged {
        slot_id: SlotId,
        state: SlotState,
        now_ms: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        acquired_by: Option<DispatchId>,
    },
    PoolSlotRemoved {
        slot_id: SlotId,
    },
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
