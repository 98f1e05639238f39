// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: construct the C1–C15 stack from [`DispatchdConfig`],
//! spawn the sweeper/reaper background tasks, and drain on shutdown.

use crate::config::DispatchdConfig;
use crate::dispatcher::Dispatcher;
use crate::operations::Operations;
use dispatch_adapters::{FakeContainerRuntime, FakeSecretSource, InMemoryBlobStore};
use dispatch_core::{Agent, Clock, ModelRegistry, SystemClock, SystemSortableIdGen};
use dispatch_engine::{
    AgentCatalog, ArtifactPublisher, FleetMetrics, StatusReconciler, TaskLauncher, WarmPool, WorkspaceHandler,
    ZombieSweeper,
};
use dispatch_storage::Storage;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("failed to create state directory: {0}")]
    StateDir(std::io::Error),
    #[error("storage error: {0}")]
    Storage(#[from] dispatch_storage::StorageError),
}

/// A fully wired, running daemon. Drop (or call [`Dispatchd::shutdown`]) to
/// stop the background sweeper/reaper loops and checkpoint storage.
pub struct Dispatchd {
    pub operations: Arc<Operations<SystemClock, SystemSortableIdGen>>,
    storage: Storage,
    tasks: Vec<JoinHandle<()>>,
}

impl Dispatchd {
    /// Wire up the repositories, adapters, and core components from
    /// `config`, eagerly replenish every agent's warm pool once, then spawn
    /// the sweeper and reaper background loops.
    ///
    /// Real `ContainerRuntime`/`BlobStore`/`SecretSource` integrations are
    /// external collaborators (§1 Non-goals) with no in-repo implementation;
    /// this wiring uses the in-memory adapters so `dispatchd` is runnable
    /// out of the box, mirroring `ModelRegistry::with_defaults`.
    pub async fn bootstrap(config: DispatchdConfig) -> Result<Self, LifecycleError> {
        std::fs::create_dir_all(&config.state_dir).map_err(LifecycleError::StateDir)?;
        let storage = Storage::open(&config.state_dir)?;

        let runtime = Arc::new(FakeContainerRuntime::new());
        let blob_store = Arc::new(InMemoryBlobStore::new());
        let secrets = Arc::new(FakeSecretSource::new());

        let launcher = Arc::new(TaskLauncher::new(AgentCatalog::with_defaults(), WorkspaceHandler::new()));
        let pool = Arc::new(WarmPool::new(
            Arc::new(storage.clone()),
            runtime.clone(),
            launcher.clone(),
            config.pool_configs.clone(),
        ));
        let artifacts = Arc::new(ArtifactPublisher::new(blob_store));
        let reconciler = Arc::new(StatusReconciler::new(Arc::new(storage.clone()), pool.clone(), artifacts.clone()));
        let sweeper = Arc::new(ZombieSweeper::new(Arc::new(storage.clone()), runtime.clone(), reconciler));
        let metrics = Arc::new(FleetMetrics::new(Arc::new(storage.clone()), Arc::new(storage.clone())));

        let dispatcher = Arc::new(Dispatcher::new(
            Arc::new(storage.clone()),
            Arc::new(storage.clone()),
            pool.clone(),
            launcher,
            runtime.clone(),
            secrets,
            ModelRegistry::with_defaults(),
            SystemSortableIdGen::default(),
            SystemClock,
            config.default_tenant_quota,
            config.idempotency_ttl_ms,
        ));
        let operations = Arc::new(Operations::new(
            dispatcher,
            Arc::new(storage.clone()),
            runtime,
            artifacts,
            metrics,
            SystemClock,
        ));

        let now_ms = SystemClock.epoch_ms();
        for agent in Agent::ALL {
            if let Err(e) = pool.replenish(agent, now_ms).await {
                warn!(agent = %agent, error = %e, "initial pool replenish failed");
            }
        }

        let tasks = vec![
            spawn_sweep_loop(sweeper, config.sweep_period),
            spawn_reap_loop(pool, config.reap_period),
        ];

        info!(state_dir = %config.state_dir.display(), "dispatchd ready");
        Ok(Self {
            operations,
            storage,
            tasks,
        })
    }

    /// Stop the background loops and flush storage to a snapshot.
    pub async fn shutdown(self) {
        for task in self.tasks {
            task.abort();
        }
        if let Err(e) = self.storage.checkpoint() {
            warn!(error = %e, "checkpoint failed during shutdown");
        }
        info!("dispatchd stopped");
    }
}

fn spawn_sweep_loop(sweeper: Arc<ZombieSweeper>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            match sweeper.sweep(SystemClock.epoch_ms()).await {
                Ok(swept) if swept > 0 => info!(swept, "zombie sweep completed"),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "zombie sweep failed"),
            }
        }
    })
}

fn spawn_reap_loop(pool: Arc<WarmPool>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            for agent in Agent::ALL {
                if let Err(e) = pool.reap(agent, SystemClock.epoch_ms()).await {
                    warn!(agent = %agent, error = %e, "pool reap failed");
                }
            }
        }
    })
}
