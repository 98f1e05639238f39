// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`DispatchRepository`] (§4.2): persistent dispatch records, conditional
//! writes, and the query shapes the sweeper/reconciler/list API need.

use crate::store::Storage;
use crate::StorageError;
use async_trait::async_trait;
use dispatch_core::{Dispatch, DispatchId, DispatchStatus, Event, TenantId};
use std::collections::HashMap;

/// The fields a status transition may additionally carry (§4.1, §4.7).
#[derive(Debug, Clone, Default)]
pub struct StatusPatch {
    pub runtime_handle: Option<String>,
    pub exit_code: Option<i32>,
    pub error_kind: Option<String>,
    pub error_message: Option<String>,
}

/// A page of `queryByTenant` results (§4.2).
#[derive(Debug, Clone)]
pub struct DispatchPage {
    pub items: Vec<Dispatch>,
    pub next_cursor: Option<String>,
}

#[async_trait]
pub trait DispatchRepository: Send + Sync {
    async fn create(&self, dispatch: Dispatch) -> Result<(), StorageError>;
    async fn get_by_id(&self, dispatch_id: &DispatchId) -> Result<Dispatch, StorageError>;
    async fn update_status(
        &self,
        dispatch_id: &DispatchId,
        expected_version: u64,
        next: DispatchStatus,
        now_ms: u64,
        patch: StatusPatch,
    ) -> Result<Dispatch, StorageError>;
    async fn set_artifact_handle(
        &self,
        dispatch_id: &DispatchId,
        artifact_handle: String,
    ) -> Result<(), StorageError>;
    async fn query_by_tenant(
        &self,
        tenant_id: &TenantId,
        cursor: Option<String>,
        limit: usize,
    ) -> Result<DispatchPage, StorageError>;
    async fn query_by_status(
        &self,
        status: DispatchStatus,
        older_than_ms: u64,
    ) -> Result<Vec<Dispatch>, StorageError>;
    async fn query_by_runtime_handle(&self, handle: &str) -> Result<Vec<Dispatch>, StorageError>;
    async fn query_by_tags(
        &self,
        tags: &HashMap<String, String>,
        limit: usize,
    ) -> Result<Vec<Dispatch>, StorageError>;
}

#[async_trait]
impl DispatchRepository for Storage {
    async fn create(&self, dispatch: Dispatch) -> Result<(), StorageError> {
        {
            let guard = self.inner.lock();
            if guard.state.dispatches.contains_key(&dispatch.dispatch_id) {
                return Err(StorageError::Duplicate(dispatch.dispatch_id.to_string()));
            }
        }
        self.append_and_apply(Event::DispatchCreated {
            dispatch: Box::new(dispatch),
        })
    }

    async fn get_by_id(&self, dispatch_id: &DispatchId) -> Result<Dispatch, StorageError> {
        let guard = self.inner.lock();
        guard
            .state
            .dispatches
            .get(dispatch_id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn update_status(
        &self,
        dispatch_id: &DispatchId,
        expected_version: u64,
        next: DispatchStatus,
        now_ms: u64,
        patch: StatusPatch,
    ) -> Result<Dispatch, StorageError> {
        {
            let guard = self.inner.lock();
            let current = guard
                .state
                .dispatches
                .get(dispatch_id)
                .ok_or(StorageError::NotFound)?;
            if current.version != expected_version {
                return Err(StorageError::StaleVersion {
                    expected: expected_version,
                    found: current.version,
                });
            }
        }
        self.append_and_apply(Event::DispatchStatusChanged {
            dispatch_id: dispatch_id.clone(),
            expected_version,
            next,
            now_ms,
            runtime_handle: patch.runtime_handle,
            exit_code: patch.exit_code,
            error_kind: patch.error_kind,
            error_message: patch.error_message,
        })?;
        self.get_by_id(dispatch_id).await
    }

    async fn set_artifact_handle(
        &self,
        dispatch_id: &DispatchId,
        artifact_handle: String,
    ) -> Result<(), StorageError> {
        {
            let guard = self.inner.lock();
            if !guard.state.dispatches.contains_key(dispatch_id) {
                return Err(StorageError::NotFound);
            }
        }
        self.append_and_apply(Event::DispatchArtifactSet {
            dispatch_id: dispatch_id.clone(),
            artifact_handle,
        })
    }

    async fn query_by_tenant(
        &self,
        tenant_id: &TenantId,
        cursor: Option<String>,
        limit: usize,
    ) -> Result<DispatchPage, StorageError> {
        let guard = self.inner.lock();
        let mut matches: Vec<&Dispatch> = guard
            .state
            .dispatches
            .values()
            .filter(|d| &d.tenant_id == tenant_id)
            .collect();
        // desc by createdAt, tie-broken by dispatchId for a stable cursor.
        matches.sort_by(|a, b| {
            b.created_at_ms
                .cmp(&a.created_at_ms)
                .then_with(|| b.dispatch_id.cmp(&a.dispatch_id))
        });

        let start = match &cursor {
            Some(c) => matches
                .iter()
                .position(|d| d.dispatch_id.as_str() == c)
                .map(|i| i + 1)
                .unwrap_or(0),
            None => 0,
        };

        let page: Vec<Dispatch> = matches
            .into_iter()
            .skip(start)
            .take(limit)
            .cloned()
            .collect();
        let next_cursor = if page.len() == limit {
            page.last().map(|d| d.dispatch_id.to_string())
        } else {
            None
        };

        Ok(DispatchPage {
            items: page,
            next_cursor,
        })
    }

    async fn query_by_status(
        &self,
        status: DispatchStatus,
        older_than_ms: u64,
    ) -> Result<Vec<Dispatch>, StorageError> {
        let guard = self.inner.lock();
        Ok(guard
            .state
            .dispatches
            .values()
            .filter(|d| d.status == status && d.created_at_ms < older_than_ms)
            .cloned()
            .collect())
    }

    async fn query_by_runtime_handle(&self, handle: &str) -> Result<Vec<Dispatch>, StorageError> {
        let guard = self.inner.lock();
        Ok(guard
            .state
            .dispatches
            .values()
            .filter(|d| d.runtime_handle.as_deref() == Some(handle))
            .cloned()
            .collect())
    }

    async fn query_by_tags(
        &self,
        tags: &HashMap<String, String>,
        limit: usize,
    ) -> Result<Vec<Dispatch>, StorageError> {
        let guard = self.inner.lock();
        Ok(guard
            .state
            .dispatches
            .values()
            .filter(|d| tags.iter().all(|(k, v)| d.tags.get(k) == Some(v)))
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
#[path = "repository_tests.rs"]
mod tests;
