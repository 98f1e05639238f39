// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`TaskLauncher`] (§4.5): composes environment, workspace mount, and
//! resource overrides into a [`LaunchSpec`] and invokes [`ContainerRuntime`].

use crate::error::EngineError;
use crate::workspace::WorkspaceHandler;
use dispatch_adapters::{ContainerRuntime, LaunchSpec, RuntimeAdapterError, SecretSource};
use dispatch_core::{Agent, Constraints, Dispatch};
use std::collections::HashMap;

/// Environment variable keys the control plane injects into every launch;
/// mirrors `dispatch_core::request::BASE_ENV_KEYS` — an `additionalSecrets`
/// alias may not shadow one of these (enforced at validation time, §3.1).
const BASE_ENV_KEYS: &[&str] = &[
    "PATH",
    "HOME",
    "OUTPOST_DISPATCH_ID",
    "OUTPOST_TENANT_ID",
    "OUTPOST_AGENT",
    "OUTPOST_MODEL_ID",
    "OUTPOST_TASK_TIMEOUT_SECONDS",
];

/// Per-agent resource tier ceiling; a dispatch's `constraints` may not
/// exceed these at launch time (§4.5).
#[derive(Debug, Clone, Copy)]
pub struct ResourceCeiling {
    pub max_memory_mb: u32,
    pub max_cpu_units: u32,
    pub max_disk_gb: u32,
}

impl Default for ResourceCeiling {
    fn default() -> Self {
        Self {
            max_memory_mb: 8192,
            max_cpu_units: 4000,
            max_disk_gb: 20,
        }
    }
}

/// Per-agent image selector and resource ceiling table.
#[derive(Debug, Clone)]
pub struct AgentCatalog {
    images: HashMap<Agent, String>,
    ceilings: HashMap<Agent, ResourceCeiling>,
}

impl AgentCatalog {
    pub fn with_defaults() -> Self {
        let mut images = HashMap::new();
        let mut ceilings = HashMap::new();
        for agent in Agent::ALL {
            images.insert(agent, format!("{}:latest", agent.as_str()));
            ceilings.insert(agent, ResourceCeiling::default());
        }
        Self { images, ceilings }
    }

    pub fn image_for(&self, agent: Agent) -> String {
        self.images
            .get(&agent)
            .cloned()
            .unwrap_or_else(|| format!("{}:latest", agent.as_str()))
    }

    pub fn ceiling_for(&self, agent: Agent) -> ResourceCeiling {
        self.ceilings.get(&agent).copied().unwrap_or_default()
    }
}

impl Default for AgentCatalog {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn check_ceiling(constraints: &Constraints, ceiling: &ResourceCeiling) -> Result<(), EngineError> {
    if let Some(mb) = constraints.max_memory_mb {
        if mb > ceiling.max_memory_mb {
            return Err(EngineError::LaunchRejected(format!(
                "maxMemoryMb {mb} exceeds tier ceiling {}",
                ceiling.max_memory_mb
            )));
        }
    }
    if let Some(cpu) = constraints.max_cpu_units {
        if cpu > ceiling.max_cpu_units {
            return Err(EngineError::LaunchRejected(format!(
                "maxCpuUnits {cpu} exceeds tier ceiling {}",
                ceiling.max_cpu_units
            )));
        }
    }
    if let Some(gb) = constraints.max_disk_gb {
        if gb > ceiling.max_disk_gb {
            return Err(EngineError::LaunchRejected(format!(
                "maxDiskGb {gb} exceeds tier ceiling {}",
                ceiling.max_disk_gb
            )));
        }
    }
    Ok(())
}

pub struct TaskLauncher {
    catalog: AgentCatalog,
    workspace: WorkspaceHandler,
}

impl TaskLauncher {
    pub fn new(catalog: AgentCatalog, workspace: WorkspaceHandler) -> Self {
        Self { catalog, workspace }
    }

    /// Compose a [`LaunchSpec`] for `dispatch` (§4.5): ceiling-checked
    /// resource overrides, resolved `additionalSecrets` merged over the
    /// base environment, workspace mount, and dispatchId/tenantId/tags
    /// metadata. Holds the persistent-volume lock (OQ2) only for the
    /// duration of `with_spec`, so callers run their runtime call (launch
    /// or bind) with the lock held and release it immediately after.
    async fn with_spec<F, Fut, T>(
        &self,
        dispatch: &Dispatch,
        secrets: &dyn SecretSource,
        f: F,
    ) -> Result<T, EngineError>
    where
        F: FnOnce(LaunchSpec) -> Fut,
        Fut: std::future::Future<Output = Result<T, RuntimeAdapterError>>,
    {
        check_ceiling(&dispatch.constraints, &self.catalog.ceiling_for(dispatch.agent))?;

        let mut env = HashMap::new();
        env.insert("OUTPOST_DISPATCH_ID".to_string(), dispatch.dispatch_id.to_string());
        env.insert("OUTPOST_TENANT_ID".to_string(), dispatch.tenant_id.to_string());
        env.insert("OUTPOST_AGENT".to_string(), dispatch.agent.as_str().to_string());
        env.insert("OUTPOST_MODEL_ID".to_string(), dispatch.model_id.clone());
        env.insert(
            "OUTPOST_TASK_TIMEOUT_SECONDS".to_string(),
            dispatch.timeout_seconds.to_string(),
        );

        for (alias, handle) in &dispatch.additional_secrets {
            if BASE_ENV_KEYS.contains(&alias.as_str()) {
                // Already rejected at request validation; defensive no-op here.
                continue;
            }
            let bytes = secrets.resolve(handle).await?;
            env.insert(alias.clone(), String::from_utf8_lossy(bytes.expose()).into_owned());
        }

        let mut tags = dispatch.tags.clone();
        tags.insert("tenant_id".to_string(), dispatch.tenant_id.to_string());

        let persistent_guard = match dispatch.workspace_mode {
            dispatch_core::WorkspaceMode::Persistent => {
                let key = self
                    .workspace
                    .volume_key(dispatch.tenant_id.as_str(), dispatch.repo.as_deref().unwrap_or_default());
                Some(self.workspace.lock_volume(&key).await)
            }
            _ => None,
        };

        let mount = self.workspace.mount_for(
            dispatch.workspace_mode,
            dispatch.tenant_id.as_str(),
            dispatch.repo.as_deref(),
            dispatch.branch.as_deref(),
        );

        let spec = LaunchSpec {
            image: self.catalog.image_for(dispatch.agent),
            env,
            mount,
            max_memory_mb: dispatch.constraints.max_memory_mb,
            max_cpu_units: dispatch.constraints.max_cpu_units,
            max_disk_gb: dispatch.constraints.max_disk_gb,
            dispatch_id: Some(dispatch.dispatch_id.clone()),
            tags,
        };

        let result = f(spec).await.map_err(EngineError::from);
        drop(persistent_guard);
        result
    }

    /// Compose and launch a bound dispatch on a freshly started container
    /// (§4.6 step 7, cold path).
    pub async fn launch(
        &self,
        dispatch: &Dispatch,
        runtime: &dyn ContainerRuntime,
        secrets: &dyn SecretSource,
    ) -> Result<String, EngineError> {
        self.with_spec(dispatch, secrets, |spec| runtime.launch(spec)).await
    }

    /// Compose the same [`LaunchSpec`] as [`Self::launch`] and apply it to
    /// an already-running warm-pool instance (§4.6 step 7, warm path):
    /// same ceiling check, secret resolution, workspace mount, and
    /// dispatchId/tenantId/tags metadata, but reconfigures `runtime_handle`
    /// in place instead of starting a second container.
    pub async fn bind(
        &self,
        dispatch: &Dispatch,
        runtime_handle: &str,
        runtime: &dyn ContainerRuntime,
        secrets: &dyn SecretSource,
    ) -> Result<String, EngineError> {
        self.with_spec(dispatch, secrets, |spec| runtime.bind(runtime_handle, spec))
            .await?;
        Ok(runtime_handle.to_string())
    }

    /// Launch a placeholder worker with no dispatch bound (§4.4 replenish):
    /// empty mount, no secrets, no metadata beyond the agent image.
    pub async fn launch_placeholder(
        &self,
        agent: Agent,
        runtime: &dyn ContainerRuntime,
    ) -> Result<String, EngineError> {
        let spec = LaunchSpec {
            image: self.catalog.image_for(agent),
            env: HashMap::new(),
            mount: dispatch_adapters::MountSpec::Empty,
            max_memory_mb: None,
            max_cpu_units: None,
            max_disk_gb: None,
            dispatch_id: None,
            tags: HashMap::new(),
        };
        runtime.launch(spec).await.map_err(EngineError::from)
    }
}

#[cfg(test)]
#[path = "launcher_tests.rs"]
mod tests;
