// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`Dispatcher`] (§4.6): the create-dispatch request algorithm —
//! validate, admit, claim idempotency, persist, acquire-or-cold-launch,
//! and leave the record terminal on any failure after creation.

use dispatch_adapters::{ContainerRuntime, SecretSource};
use dispatch_core::{
    Clock, Dispatch, DispatchError, DispatchId, DispatchStatus, ModelRegistry, SortableIdGen, TenantId,
    ValidatedDispatchRequest,
};
use dispatch_engine::{EngineError, TaskLauncher, WarmPool};
use dispatch_storage::{DispatchRepository, IdempotencyStore, StatusPatch, StorageError};
use std::sync::Arc;

fn classify(e: EngineError) -> DispatchError {
    match e {
        EngineError::Storage(_) => DispatchError::Internal(e.to_string()),
        EngineError::LaunchRejected(msg) => DispatchError::Launch(msg),
        EngineError::Capacity => DispatchError::Unavailable { retry_after_secs: 5 },
        EngineError::Secret(msg) => DispatchError::Launch(msg),
        EngineError::Artifact(msg) => DispatchError::Artifact(msg),
        EngineError::NotFound(msg) => DispatchError::Launch(msg),
        EngineError::Internal(msg) => DispatchError::Internal(msg),
    }
}

/// A created (or idempotently-replayed) dispatch, with the `idempotent`
/// flag `createDispatch` must surface (§6.1).
#[derive(Debug, Clone)]
pub struct CreatedDispatch {
    pub dispatch: Dispatch,
    pub idempotent: bool,
}

pub struct Dispatcher<C: Clock, G: SortableIdGen> {
    repo: Arc<dyn DispatchRepository>,
    idempotency: Arc<dyn IdempotencyStore>,
    pool: Arc<WarmPool>,
    launcher: Arc<TaskLauncher>,
    runtime: Arc<dyn ContainerRuntime>,
    secrets: Arc<dyn SecretSource>,
    models: ModelRegistry,
    id_gen: G,
    clock: C,
    tenant_quota: usize,
    idempotency_ttl_ms: u64,
}

impl<C: Clock, G: SortableIdGen> Dispatcher<C, G> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repo: Arc<dyn DispatchRepository>,
        idempotency: Arc<dyn IdempotencyStore>,
        pool: Arc<WarmPool>,
        launcher: Arc<TaskLauncher>,
        runtime: Arc<dyn ContainerRuntime>,
        secrets: Arc<dyn SecretSource>,
        models: ModelRegistry,
        id_gen: G,
        clock: C,
        tenant_quota: usize,
        idempotency_ttl_ms: u64,
    ) -> Self {
        Self {
            repo,
            idempotency,
            pool,
            launcher,
            runtime,
            secrets,
            models,
            id_gen,
            clock,
            tenant_quota,
            idempotency_ttl_ms,
        }
    }

    /// Run the full §4.6 algorithm for one inbound request.
    pub async fn create(&self, request: ValidatedDispatchRequest) -> Result<CreatedDispatch, DispatchError> {
        let tenant_id = TenantId::new(request.tenant_id.clone());
        let now_ms = self.clock.epoch_ms();

        self.check_quota(&tenant_id).await?;

        let dispatch_id = DispatchId::new(self.id_gen.next(now_ms));

        if let Some(key) = &request.idempotency_key {
            match self
                .idempotency
                .claim(&tenant_id, key, dispatch_id.clone(), now_ms, self.idempotency_ttl_ms)
                .await
            {
                Ok(()) => {}
                Err(StorageError::AlreadyClaimed { dispatch_id: existing }) => {
                    let dispatch = self
                        .repo
                        .get_by_id(&existing)
                        .await
                        .map_err(|_| DispatchError::NotFound)?;
                    return Ok(CreatedDispatch {
                        dispatch,
                        idempotent: true,
                    });
                }
                Err(e) => return Err(DispatchError::Internal(e.to_string())),
            }
        }

        let dispatch = Dispatch::new_pending(
            dispatch_id.clone(),
            tenant_id,
            request.idempotency_key,
            request.agent,
            request.model_id,
            request.task,
            request.repo,
            request.branch,
            request.context_level,
            request.workspace_mode,
            request.timeout_seconds,
            request.constraints,
            request.tags,
            request.additional_secrets,
            now_ms,
        );
        self.repo
            .create(dispatch.clone())
            .await
            .map_err(|e| DispatchError::Internal(e.to_string()))?;

        let slot = self.pool.acquire(dispatch.agent, dispatch_id.clone(), now_ms).await.ok().flatten();

        // A warm slot's id is the runtime handle of an already-running
        // placeholder container (§4.4 replenish) started with no dispatch
        // bound (`launch_placeholder`). Binding it still runs the full
        // launch composition — ceiling check, secret resolution, workspace
        // mount, dispatchId/tenantId/tags metadata (§4.5) — against the
        // running instance instead of starting a second container. EMPTY
        // falls back to a cold launch (§4.4).
        let launch_result: Result<String, EngineError> = match &slot {
            Some(slot_id) => {
                self.launcher
                    .bind(&dispatch, slot_id.as_str(), self.runtime.as_ref(), self.secrets.as_ref())
                    .await
            }
            None => self.launcher.launch(&dispatch, self.runtime.as_ref(), self.secrets.as_ref()).await,
        };

        match launch_result {
            Ok(runtime_handle) => {
                let provisioned = self
                    .repo
                    .update_status(
                        &dispatch_id,
                        1,
                        DispatchStatus::Provisioning,
                        now_ms,
                        StatusPatch {
                            runtime_handle: Some(runtime_handle),
                            ..Default::default()
                        },
                    )
                    .await
                    .map_err(|e| DispatchError::Internal(e.to_string()))?;
                Ok(CreatedDispatch {
                    dispatch: provisioned,
                    idempotent: false,
                })
            }
            Err(e) => {
                let classified = classify(e);
                self.repo
                    .update_status(
                        &dispatch_id,
                        1,
                        DispatchStatus::Failed,
                        now_ms,
                        StatusPatch {
                            error_kind: Some(classified.kind().to_string()),
                            error_message: Some(classified.message()),
                            ..Default::default()
                        },
                    )
                    .await
                    .map_err(|e| DispatchError::Internal(e.to_string()))?;
                if let Some(slot_id) = slot {
                    let _ = self.pool.release(&slot_id, now_ms).await;
                }
                Err(classified)
            }
        }
    }

    async fn check_quota(&self, tenant_id: &TenantId) -> Result<(), DispatchError> {
        let page = self
            .repo
            .query_by_tenant(tenant_id, None, usize::MAX)
            .await
            .map_err(|e| DispatchError::Internal(e.to_string()))?;
        let non_terminal = page.items.iter().filter(|d| !d.status.is_terminal()).count();
        if non_terminal >= self.tenant_quota {
            return Err(DispatchError::Quota);
        }
        Ok(())
    }

    /// Dereference `models` so `operations.rs` can resolve/validate a raw
    /// request before calling [`Dispatcher::create`].
    pub fn model_registry(&self) -> &ModelRegistry {
        &self.models
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
