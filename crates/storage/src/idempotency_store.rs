// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`IdempotencyStore`] (§4.3): put-if-absent claims keyed by
//! `(tenantId, idempotencyKey)`, so a retried create request resolves to
//! the dispatch the first attempt created instead of making a second one.

use crate::store::Storage;
use crate::StorageError;
use async_trait::async_trait;
use dispatch_core::{DispatchId, Event, IdempotencyRecord, TenantId};

#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    /// First writer wins. Returns `AlreadyClaimed` with the dispatch the
    /// existing, unexpired claim points at; the caller treats that as the
    /// result of the retried request rather than an error.
    async fn claim(
        &self,
        tenant_id: &TenantId,
        idempotency_key: &str,
        dispatch_id: DispatchId,
        now_ms: u64,
        ttl_ms: u64,
    ) -> Result<(), StorageError>;

    async fn lookup(&self, tenant_id: &TenantId, idempotency_key: &str) -> Option<DispatchId>;
}

#[async_trait]
impl IdempotencyStore for Storage {
    async fn claim(
        &self,
        tenant_id: &TenantId,
        idempotency_key: &str,
        dispatch_id: DispatchId,
        now_ms: u64,
        ttl_ms: u64,
    ) -> Result<(), StorageError> {
        {
            let guard = self.inner.lock();
            let key = (tenant_id.clone(), idempotency_key.to_string());
            if let Some(existing) = guard.state.idempotency.get(&key) {
                if !existing.is_expired(now_ms) {
                    return Err(StorageError::AlreadyClaimed {
                        dispatch_id: existing.dispatch_id.clone(),
                    });
                }
            }
        }
        self.append_and_apply(Event::IdempotencyClaimed {
            record: IdempotencyRecord {
                tenant_id: tenant_id.to_string(),
                idempotency_key: idempotency_key.to_string(),
                dispatch_id,
                created_at_ms: now_ms,
                ttl_ms: now_ms + ttl_ms,
            },
        })
    }

    async fn lookup(&self, tenant_id: &TenantId, idempotency_key: &str) -> Option<DispatchId> {
        let guard = self.inner.lock();
        let key = (tenant_id.clone(), idempotency_key.to_string());
        guard.state.idempotency.get(&key).map(|r| r.dispatch_id.clone())
    }
}

#[cfg(test)]
#[path = "idempotency_store_tests.rs"]
mod tests;
