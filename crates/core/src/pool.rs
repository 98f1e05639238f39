// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Warm pool slot record (§3.2).

use crate::agent::Agent;
use crate::dispatch::DispatchId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique slot identifier; equals the runtime handle once provisioned.
    pub struct SlotId;
}

/// Slot lifecycle state (§3.2, §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotState {
    Warming,
    Warm,
    Acquired,
    Releasing,
}

/// A pool slot: created by the WarmPool warmer, mutated by acquire/release
/// and by the StatusReconciler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolSlot {
    pub slot_id: SlotId,
    pub agent: Agent,
    pub state: SlotState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquired_by: Option<DispatchId>,
    pub created_at_ms: u64,
    pub last_healthy_at_ms: u64,
    pub ttl_ms: u64,
}

impl PoolSlot {
    pub fn new_warming(slot_id: SlotId, agent: Agent, now_ms: u64, warm_timeout_ms: u64) -> Self {
        Self {
            slot_id,
            agent,
            state: SlotState::Warming,
            acquired_by: None,
            created_at_ms: now_ms,
            last_healthy_at_ms: now_ms,
            ttl_ms: now_ms + warm_timeout_ms,
        }
    }

    pub fn is_idle_expired(&self, now_ms: u64) -> bool {
        self.state == SlotState::Warm && now_ms > self.ttl_ms
    }

    pub fn is_health_stale(&self, now_ms: u64, health_check_period_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_healthy_at_ms) > 2 * health_check_period_ms
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
