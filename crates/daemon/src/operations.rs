// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`Operations`] (§4.11 / §6.1): the transport-agnostic façade an HTTP
//! layer calls into. Argument shaping and response assembly only — all
//! business logic lives in [`Dispatcher`]/[`StatusReconciler`]/
//! [`FleetMetrics`]/[`ArtifactPublisher`].

use crate::dispatcher::{CreatedDispatch, Dispatcher};
use dispatch_adapters::ContainerRuntime;
use dispatch_core::{
    Agent, Clock, Dispatch, DispatchError, DispatchId, DispatchStatus, SortableIdGen, TenantId,
    ValidatedDispatchRequest,
};
use dispatch_engine::{ArtifactPublisher, FleetMetrics, FleetSnapshot};
use dispatch_storage::{DispatchRepository, StatusPatch, StorageError};
use std::collections::HashMap;
use std::sync::Arc;

const MAX_CANCEL_RETRIES: u32 = 3;

/// `createDispatch` response (§6.1).
#[derive(Debug, Clone)]
pub struct CreateDispatchResponse {
    pub dispatch_id: DispatchId,
    pub status: DispatchStatus,
    pub agent: Agent,
    pub model_id: String,
    pub idempotent: bool,
}

impl From<CreatedDispatch> for CreateDispatchResponse {
    fn from(created: CreatedDispatch) -> Self {
        Self {
            dispatch_id: created.dispatch.dispatch_id,
            status: created.dispatch.status,
            agent: created.dispatch.agent,
            model_id: created.dispatch.model_id,
            idempotent: created.idempotent,
        }
    }
}

/// Optional log-page arguments to `getDispatch` (§6.1). Log retrieval reads
/// container-internal stdout, which is opaque container machinery (§1
/// Non-goals); until a log store exists, every page comes back empty.
#[derive(Debug, Clone, Default)]
pub struct GetDispatchOptions {
    pub log_offset: usize,
    pub log_limit: usize,
    pub skip_logs: bool,
}

#[derive(Debug, Clone, Default)]
pub struct LogPage {
    pub offset: usize,
    pub entries: Vec<String>,
    pub has_more: bool,
}

#[derive(Debug, Clone)]
pub struct DispatchView {
    pub dispatch: Dispatch,
    pub logs: LogPage,
}

#[derive(Debug, Clone)]
pub struct CancelResponse {
    pub status: DispatchStatus,
}

/// `listDispatches` filter (§6.1). `tenant_id` is supplied by the caller
/// from the already-authenticated request context, not by this struct.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub status: Option<DispatchStatus>,
    pub agent: Option<Agent>,
    pub tags: HashMap<String, String>,
    pub since_ms: Option<u64>,
    pub limit: usize,
    pub cursor: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DispatchPageView {
    pub items: Vec<Dispatch>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

#[derive(Debug, Clone)]
pub struct ArtifactView {
    pub kind: String,
    pub handle: String,
    pub expires_at_ms: u64,
    pub size_bytes: Option<u64>,
    pub content_type: String,
}

fn content_type_for(kind: &str) -> &'static str {
    match kind {
        "stdout" => "text/plain",
        "diff" => "text/x-diff",
        _ => "application/json",
    }
}

/// Cancelable per §5 "Cancellation": PENDING, PROVISIONING, RUNNING.
fn is_cancelable(status: DispatchStatus) -> bool {
    matches!(status, DispatchStatus::Pending | DispatchStatus::Provisioning | DispatchStatus::Running)
}

pub struct Operations<C: Clock, G: SortableIdGen> {
    dispatcher: Arc<Dispatcher<C, G>>,
    repo: Arc<dyn DispatchRepository>,
    runtime: Arc<dyn ContainerRuntime>,
    artifacts: Arc<ArtifactPublisher>,
    metrics: Arc<FleetMetrics>,
    clock: C,
}

impl<C: Clock, G: SortableIdGen> Operations<C, G> {
    pub fn new(
        dispatcher: Arc<Dispatcher<C, G>>,
        repo: Arc<dyn DispatchRepository>,
        runtime: Arc<dyn ContainerRuntime>,
        artifacts: Arc<ArtifactPublisher>,
        metrics: Arc<FleetMetrics>,
        clock: C,
    ) -> Self {
        Self {
            dispatcher,
            repo,
            runtime,
            artifacts,
            metrics,
            clock,
        }
    }

    pub async fn create_dispatch(
        &self,
        request: ValidatedDispatchRequest,
    ) -> Result<CreateDispatchResponse, DispatchError> {
        self.dispatcher.create(request).await.map(Into::into)
    }

    pub async fn get_dispatch(
        &self,
        dispatch_id: &DispatchId,
        opts: GetDispatchOptions,
    ) -> Result<DispatchView, DispatchError> {
        let dispatch = self.fetch(dispatch_id).await?;
        let logs = if opts.skip_logs {
            LogPage::default()
        } else {
            LogPage {
                offset: opts.log_offset,
                entries: Vec::new(),
                has_more: false,
            }
        };
        Ok(DispatchView { dispatch, logs })
    }

    /// §5 "Cancellation": conditional update to CANCELLED from a
    /// non-terminal, pre-COMPLETING status, then a best-effort
    /// `ContainerRuntime.stop`. Already-terminal (or COMPLETING) records
    /// reject with CONFLICT rather than being silently ignored.
    pub async fn cancel_dispatch(
        &self,
        dispatch_id: &DispatchId,
        reason: Option<String>,
    ) -> Result<CancelResponse, DispatchError> {
        let mut dispatch = self.fetch(dispatch_id).await?;
        let now_ms = self.clock.epoch_ms();

        for attempt in 0..=MAX_CANCEL_RETRIES {
            if !is_cancelable(dispatch.status) {
                return Err(DispatchError::Conflict(format!(
                    "dispatch is {} and cannot be cancelled",
                    dispatch.status
                )));
            }
            match self
                .repo
                .update_status(
                    dispatch_id,
                    dispatch.version,
                    DispatchStatus::Cancelled,
                    now_ms,
                    StatusPatch {
                        error_kind: Some("CANCELLED".to_string()),
                        error_message: reason.clone(),
                        ..Default::default()
                    },
                )
                .await
            {
                Ok(updated) => {
                    if let Some(handle) = &updated.runtime_handle {
                        let stop_reason = reason.as_deref().unwrap_or("cancel requested");
                        let _ = self.runtime.stop(handle, stop_reason).await;
                    }
                    return Ok(CancelResponse {
                        status: updated.status,
                    });
                }
                Err(StorageError::StaleVersion { .. }) if attempt < MAX_CANCEL_RETRIES => {
                    dispatch = self.fetch(dispatch_id).await?;
                }
                Err(e) => return Err(DispatchError::Internal(e.to_string())),
            }
        }
        Err(DispatchError::Internal(format!(
            "exhausted version retries cancelling {dispatch_id}"
        )))
    }

    /// `tags` is an AND-logic filter (§4.2); when present it drives the
    /// primary query since it is the most selective index available.
    /// Otherwise `queryByTenant`'s own cursor does the pagination.
    pub async fn list_dispatches(
        &self,
        tenant_id: &TenantId,
        filter: ListFilter,
    ) -> Result<DispatchPageView, DispatchError> {
        let limit = filter.limit.max(1);

        if filter.tags.is_empty() {
            let page = self
                .repo
                .query_by_tenant(tenant_id, filter.cursor.clone(), limit)
                .await
                .map_err(|e| DispatchError::Internal(e.to_string()))?;
            let items: Vec<Dispatch> = page
                .items
                .into_iter()
                .filter(|d| filter.status.is_none_or(|s| d.status == s))
                .filter(|d| filter.agent.is_none_or(|a| d.agent == a))
                .filter(|d| filter.since_ms.is_none_or(|since| d.created_at_ms >= since))
                .collect();
            let has_more = page.next_cursor.is_some();
            return Ok(DispatchPageView {
                items,
                next_cursor: page.next_cursor,
                has_more,
            });
        }

        let mut items: Vec<Dispatch> = self
            .repo
            .query_by_tags(&filter.tags, usize::MAX)
            .await
            .map_err(|e| DispatchError::Internal(e.to_string()))?
            .into_iter()
            .filter(|d| d.tenant_id == *tenant_id)
            .filter(|d| filter.status.is_none_or(|s| d.status == s))
            .filter(|d| filter.agent.is_none_or(|a| d.agent == a))
            .filter(|d| filter.since_ms.is_none_or(|since| d.created_at_ms >= since))
            .collect();
        items.sort_by(|a, b| b.created_at_ms.cmp(&a.created_at_ms));

        let offset: usize = filter
            .cursor
            .as_deref()
            .and_then(|c| c.parse().ok())
            .unwrap_or(0);
        let has_more = items.len() > offset + limit;
        let next_cursor = has_more.then(|| (offset + limit).to_string());
        let page = items.into_iter().skip(offset).take(limit).collect();

        Ok(DispatchPageView {
            items: page,
            next_cursor,
            has_more,
        })
    }

    /// NOT_FOUND if terminal with no artifact (e.g. a FAILED dispatch whose
    /// publish attempt also failed); CONFLICT if not yet terminal (§6.1).
    pub async fn get_artifacts(
        &self,
        dispatch_id: &DispatchId,
        expires_in_secs: u64,
    ) -> Result<Vec<ArtifactView>, DispatchError> {
        let dispatch = self.fetch(dispatch_id).await?;
        if !dispatch.status.is_terminal() {
            return Err(DispatchError::Conflict("dispatch has not reached a terminal state".to_string()));
        }
        let Some(handle) = &dispatch.artifact_handle else {
            return Err(DispatchError::NotFound);
        };

        let now_ms = self.clock.epoch_ms();
        let presigned = self
            .artifacts
            .presign_all(handle)
            .await
            .map_err(|e| DispatchError::Internal(e.to_string()))?;

        Ok(presigned
            .into_iter()
            .map(|(kind, url)| ArtifactView {
                content_type: content_type_for(&kind).to_string(),
                kind,
                handle: url,
                expires_at_ms: now_ms + expires_in_secs * 1000,
                size_bytes: None,
            })
            .collect())
    }

    pub async fn fleet_status(&self) -> FleetSnapshot {
        self.metrics.snapshot(self.clock.epoch_ms()).await
    }

    async fn fetch(&self, dispatch_id: &DispatchId) -> Result<Dispatch, DispatchError> {
        self.repo.get_by_id(dispatch_id).await.map_err(|e| match e {
            StorageError::NotFound => DispatchError::NotFound,
            other => DispatchError::Internal(other.to_string()),
        })
    }
}

#[cfg(test)]
#[path = "operations_tests.rs"]
mod tests;
