// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`StatusReconciler`] (§4.7): maps termination events onto terminal
//! dispatch states exactly once, order- and duplicate-insensitive.

use crate::artifact::ArtifactPublisher;
use crate::error::EngineError;
use crate::pool::WarmPool;
use dispatch_adapters::{StopCode, TerminationEvent};
use dispatch_core::{Dispatch, DispatchStatus, SlotId};
use dispatch_storage::{DispatchRepository, StatusPatch, StorageError};
use std::sync::Arc;
use tracing::warn;

/// Conditional-write contention is retried this many times before giving up
/// (§4.1, §4.7 step 3; `STALE_VERSION` is internal-only per §7).
const MAX_VERSION_RETRIES: u32 = 3;

/// Map a termination event onto the terminal status it represents (§4.7 step 2).
fn map_status(event: &TerminationEvent) -> DispatchStatus {
    if event.stop_code == StopCode::UserInitiated {
        return DispatchStatus::Cancelled;
    }
    if event.stop_reason.to_lowercase().contains("timeout") {
        return DispatchStatus::Timeout;
    }
    if event.exit_code == Some(0) && event.stop_code != StopCode::TaskFailedToStart {
        return DispatchStatus::Success;
    }
    DispatchStatus::Failed
}

/// If none match, drop (unbound pool slot, §4.7 step 1); if multiple, take
/// the non-terminal one; if only terminal matches exist, return one anyway
/// so the caller can run the idempotent-replay / terminal-mismatch check
/// (step 3) instead of silently dropping it.
fn select_target(mut candidates: Vec<Dispatch>) -> Option<Dispatch> {
    if candidates.is_empty() {
        return None;
    }
    if let Some(pos) = candidates.iter().position(|d| !d.status.is_terminal()) {
        return Some(candidates.swap_remove(pos));
    }
    Some(candidates.swap_remove(0))
}

pub struct StatusReconciler {
    repo: Arc<dyn DispatchRepository>,
    pool: Arc<WarmPool>,
    artifacts: Arc<ArtifactPublisher>,
}

impl StatusReconciler {
    pub fn new(repo: Arc<dyn DispatchRepository>, pool: Arc<WarmPool>, artifacts: Arc<ArtifactPublisher>) -> Self {
        Self { repo, pool, artifacts }
    }

    async fn transition_with_retry(
        &self,
        mut dispatch: Dispatch,
        next: DispatchStatus,
        now_ms: u64,
        patch: StatusPatch,
    ) -> Result<Dispatch, EngineError> {
        for attempt in 0..=MAX_VERSION_RETRIES {
            let expected_version = dispatch.version;
            match self
                .repo
                .update_status(&dispatch.dispatch_id, expected_version, next, now_ms, patch.clone())
                .await
            {
                Ok(updated) => return Ok(updated),
                Err(StorageError::StaleVersion { .. }) if attempt < MAX_VERSION_RETRIES => {
                    dispatch = self.repo.get_by_id(&dispatch.dispatch_id).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(EngineError::Internal(format!(
            "exhausted version retries reconciling {}",
            dispatch.dispatch_id
        )))
    }

    /// Apply one termination event (§4.7). Duplicate or out-of-order
    /// delivery is harmless: terminal dispatches are matched against the
    /// previously-recorded status and either no-op (same status) or warn
    /// and leave the record untouched (different status, e.g. a cancel
    /// race — S4).
    pub async fn reconcile_one(&self, event: TerminationEvent, now_ms: u64) -> Result<(), EngineError> {
        let candidates = self.repo.query_by_runtime_handle(&event.runtime_handle).await?;
        let Some(dispatch) = select_target(candidates) else {
            return Ok(());
        };

        let mapped = map_status(&event);

        if dispatch.status.is_terminal() {
            if dispatch.status != mapped {
                warn!(
                    dispatch_id = %dispatch.dispatch_id,
                    recorded = %dispatch.status,
                    mapped = %mapped,
                    "termination event mapped to a different terminal status than the recorded one; keeping recorded status"
                );
            }
            // Same status: idempotent replay (I6), nothing to do.
            self.pool.release(&SlotId::new(event.runtime_handle.clone()), now_ms).await?;
            return Ok(());
        }

        match mapped {
            DispatchStatus::Success => {
                let completing = self
                    .transition_with_retry(dispatch, DispatchStatus::Completing, now_ms, StatusPatch::default())
                    .await?;
                match self.artifacts.publish(&completing, Vec::new(), Vec::new()).await {
                    Ok(artifact_handle) => {
                        self.repo
                            .set_artifact_handle(&completing.dispatch_id, artifact_handle)
                            .await?;
                        self.transition_with_retry(
                            completing,
                            DispatchStatus::Success,
                            now_ms,
                            StatusPatch {
                                exit_code: event.exit_code,
                                ..Default::default()
                            },
                        )
                        .await?;
                    }
                    Err(e) => {
                        let current = self.repo.get_by_id(&completing.dispatch_id).await?;
                        if current.status == DispatchStatus::Completing {
                            self.transition_with_retry(
                                current,
                                DispatchStatus::Failed,
                                now_ms,
                                StatusPatch {
                                    exit_code: event.exit_code,
                                    error_kind: Some("ARTIFACT".to_string()),
                                    error_message: Some(e.to_string()),
                                    ..Default::default()
                                },
                            )
                            .await?;
                        }
                    }
                }
            }
            DispatchStatus::Failed => {
                // TaskFailedToStart means the runtime never got the container
                // running at all, the same deterministic-rejection class as
                // a Dispatcher-side launch failure (§7 LAUNCH). A non-zero
                // exit after the container actually ran is a distinct,
                // non-deterministic failure mode and must not be reported
                // under the same errorKind.
                let error_kind = if event.stop_code == StopCode::TaskFailedToStart {
                    "LAUNCH"
                } else {
                    "RUNTIME_EXIT"
                };
                let failed = self
                    .transition_with_retry(
                        dispatch,
                        DispatchStatus::Failed,
                        now_ms,
                        StatusPatch {
                            exit_code: event.exit_code,
                            error_kind: Some(error_kind.to_string()),
                            error_message: Some(event.stop_reason.clone()),
                            ..Default::default()
                        },
                    )
                    .await?;
                if let Ok(artifact_handle) = self.artifacts.publish(&failed, Vec::new(), Vec::new()).await {
                    let _ = self.repo.set_artifact_handle(&failed.dispatch_id, artifact_handle).await;
                }
            }
            other => {
                self.transition_with_retry(dispatch, other, now_ms, StatusPatch::default())
                    .await?;
            }
        }

        self.pool.release(&SlotId::new(event.runtime_handle.clone()), now_ms).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "reconciler_tests.rs"]
mod tests;
