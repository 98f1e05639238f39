// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Idempotency record (§3.3).

use crate::dispatch::DispatchId;
use serde::{Deserialize, Serialize};

/// `(tenantId, idempotencyKey) -> dispatchId` mapping, TTL-expired.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub tenant_id: String,
    pub idempotency_key: String,
    pub dispatch_id: DispatchId,
    pub created_at_ms: u64,
    pub ttl_ms: u64,
}

impl IdempotencyRecord {
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms > self.ttl_ms
    }
}

#[cfg(test)]
#[path = "idempotency_tests.rs"]
mod tests;
