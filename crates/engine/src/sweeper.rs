// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`ZombieSweeper`] (§4.8): the only recovery path when event delivery is
//! permanently lost. Polls for dispatches stuck past their deadline, asks
//! the runtime what actually happened, and either replays a synthesized
//! termination event through [`StatusReconciler`] or marks the dispatch
//! `TIMEOUT` with `errorKind=RUNTIME_LOST` directly when the runtime no
//! longer knows about the handle.

use crate::error::EngineError;
use crate::reconciler::StatusReconciler;
use dispatch_adapters::{ContainerRuntime, RuntimeState, StopCode, TerminationEvent};
use dispatch_core::{DispatchStatus, TenantId};
use dispatch_storage::{DispatchRepository, StatusPatch};
use std::sync::Arc;
use tracing::warn;

/// Dispatches not yet provisioned past this age are also swept (§4.8 step 1).
const PENDING_STALE_MS: u64 = 5 * 60 * 1000;

pub struct ZombieSweeper {
    repo: Arc<dyn DispatchRepository>,
    runtime: Arc<dyn ContainerRuntime>,
    reconciler: Arc<StatusReconciler>,
}

impl ZombieSweeper {
    pub fn new(
        repo: Arc<dyn DispatchRepository>,
        runtime: Arc<dyn ContainerRuntime>,
        reconciler: Arc<StatusReconciler>,
    ) -> Self {
        Self {
            repo,
            runtime,
            reconciler,
        }
    }

    /// Run one sweep pass (§4.8). `now_ms` and each dispatch's
    /// `timeoutSeconds` bound how far back `RUNNING`/`PROVISIONING` go stale;
    /// `PENDING` uses the fixed [`PENDING_STALE_MS`] window.
    pub async fn sweep(&self, now_ms: u64) -> Result<usize, EngineError> {
        let mut swept = 0;
        for status in [DispatchStatus::Running, DispatchStatus::Provisioning] {
            for dispatch in self.repo.query_by_status(status, u64::MAX).await? {
                let stale_after_ms = dispatch.created_at_ms + 2 * dispatch.timeout_seconds as u64 * 1000;
                if stale_after_ms > now_ms {
                    continue;
                }
                self.sweep_one(dispatch, now_ms).await?;
                swept += 1;
            }
        }
        for dispatch in self
            .repo
            .query_by_status(DispatchStatus::Pending, now_ms.saturating_sub(PENDING_STALE_MS))
            .await?
        {
            self.sweep_one(dispatch, now_ms).await?;
            swept += 1;
        }
        Ok(swept)
    }

    async fn sweep_one(&self, dispatch: dispatch_core::Dispatch, now_ms: u64) -> Result<(), EngineError> {
        let Some(handle) = dispatch.runtime_handle.clone() else {
            // Never provisioned: no runtime to ask, so the only ground
            // truth is that it has been PENDING too long.
            self.mark_runtime_lost(&dispatch.dispatch_id, dispatch.version, &dispatch.tenant_id, now_ms)
                .await?;
            return Ok(());
        };

        match self.runtime.describe(&handle).await {
            Ok(description) if description.state != RuntimeState::Unknown => {
                let event = TerminationEvent {
                    runtime_handle: handle,
                    stop_code: if description.exit_code == Some(0) {
                        StopCode::Exited
                    } else {
                        StopCode::Other
                    },
                    stop_reason: match description.state {
                        RuntimeState::Running => "sweeper: deadline exceeded while still running".to_string(),
                        _ => "sweeper: found stopped".to_string(),
                    },
                    exit_code: description.exit_code,
                    stopped_at_ms: description.stopped_at_ms.unwrap_or(now_ms),
                };
                self.reconciler.reconcile_one(event, now_ms).await
            }
            Ok(_) | Err(_) => {
                warn!(dispatch_id = %dispatch.dispatch_id, runtime_handle = %handle, "runtime lost track of handle");
                self.mark_runtime_lost(&dispatch.dispatch_id, dispatch.version, &dispatch.tenant_id, now_ms)
                    .await
            }
        }
    }

    async fn mark_runtime_lost(
        &self,
        dispatch_id: &dispatch_core::DispatchId,
        expected_version: u64,
        _tenant_id: &TenantId,
        now_ms: u64,
    ) -> Result<(), EngineError> {
        match self
            .repo
            .update_status(
                dispatch_id,
                expected_version,
                DispatchStatus::Timeout,
                now_ms,
                StatusPatch {
                    error_kind: Some("RUNTIME_LOST".to_string()),
                    error_message: Some("sweeper could not confirm runtime state".to_string()),
                    ..Default::default()
                },
            )
            .await
        {
            Ok(_) => Ok(()),
            Err(dispatch_storage::StorageError::StaleVersion { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[path = "sweeper_tests.rs"]
mod tests;
