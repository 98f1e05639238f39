// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`ContainerRuntime`] (§6.2): launch, stop, and describe worker instances.
//! The concrete orchestrator client is genuinely external (§1); this crate
//! only carries the trait and an in-memory fake for tests.

use async_trait::async_trait;
use dispatch_core::DispatchId;
use std::collections::HashMap;
use thiserror::Error;

/// Everything the runtime needs to start a container (§4.5 TaskLauncher output).
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    pub image: String,
    pub env: HashMap<String, String>,
    pub mount: MountSpec,
    pub max_memory_mb: Option<u32>,
    pub max_cpu_units: Option<u32>,
    pub max_disk_gb: Option<u32>,
    /// Embedded so the runtime surfaces them back on termination events.
    pub dispatch_id: Option<DispatchId>,
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountSpec {
    Empty,
    SparseClone { repo: String, branch: Option<String> },
    FullClone { repo: String, branch: Option<String> },
    NamedVolume { volume_key: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeState {
    Running,
    Stopped,
    Unknown,
}

#[derive(Debug, Clone)]
pub struct RuntimeDescription {
    pub state: RuntimeState,
    pub exit_code: Option<i32>,
    pub stopped_at_ms: Option<u64>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeAdapterError {
    #[error("runtime rejected launch spec: {0}")]
    LaunchRejected(String),
    #[error("runtime at capacity")]
    Capacity,
    #[error("runtime handle not found: {0}")]
    NotFound(String),
    #[error("runtime adapter error: {0}")]
    Other(String),
}

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn launch(&self, spec: LaunchSpec) -> Result<String, RuntimeAdapterError>;
    /// Reconfigure an already-running instance for a newly bound dispatch
    /// (§4.6 step 7, warm path): applies `spec`'s env, mount, resource
    /// overrides, and metadata to `runtime_handle` without starting a new
    /// container. Must reject with `NotFound` if the handle isn't running.
    async fn bind(&self, runtime_handle: &str, spec: LaunchSpec) -> Result<(), RuntimeAdapterError>;
    /// Idempotent: must not error if the handle is already stopped.
    async fn stop(&self, runtime_handle: &str, reason: &str) -> Result<(), RuntimeAdapterError>;
    async fn describe(&self, runtime_handle: &str)
        -> Result<RuntimeDescription, RuntimeAdapterError>;
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Debug, Clone)]
    pub enum RuntimeCall {
        Launch(LaunchSpec),
        Bind { runtime_handle: String, spec: LaunchSpec },
        Stop { runtime_handle: String, reason: String },
        Describe { runtime_handle: String },
    }

    struct FakeState {
        instances: std::collections::HashMap<String, RuntimeDescription>,
        calls: Vec<RuntimeCall>,
        next_id: u64,
        reject_launches: bool,
        at_capacity: bool,
    }

    /// In-memory [`ContainerRuntime`] for tests: every launch succeeds by
    /// default and the instance stays `Running` until [`FakeContainerRuntime::set_state`]
    /// or `stop` marks it otherwise.
    #[derive(Clone)]
    pub struct FakeContainerRuntime {
        inner: Arc<Mutex<FakeState>>,
    }

    impl Default for FakeContainerRuntime {
        fn default() -> Self {
            Self {
                inner: Arc::new(Mutex::new(FakeState {
                    instances: std::collections::HashMap::new(),
                    calls: Vec::new(),
                    next_id: 0,
                    reject_launches: false,
                    at_capacity: false,
                })),
            }
        }
    }

    impl FakeContainerRuntime {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> Vec<RuntimeCall> {
            self.inner.lock().calls.clone()
        }

        pub fn set_reject_launches(&self, reject: bool) {
            self.inner.lock().reject_launches = reject;
        }

        pub fn set_at_capacity(&self, at_capacity: bool) {
            self.inner.lock().at_capacity = at_capacity;
        }

        pub fn set_state(&self, runtime_handle: &str, description: RuntimeDescription) {
            self.inner
                .lock()
                .instances
                .insert(runtime_handle.to_string(), description);
        }
    }

    #[async_trait]
    impl ContainerRuntime for FakeContainerRuntime {
        async fn launch(&self, spec: LaunchSpec) -> Result<String, RuntimeAdapterError> {
            let mut inner = self.inner.lock();
            if inner.reject_launches {
                inner.calls.push(RuntimeCall::Launch(spec));
                return Err(RuntimeAdapterError::LaunchRejected("image not found".into()));
            }
            if inner.at_capacity {
                inner.calls.push(RuntimeCall::Launch(spec));
                return Err(RuntimeAdapterError::Capacity);
            }
            inner.next_id += 1;
            let handle = format!("ctr-{}", inner.next_id);
            inner.calls.push(RuntimeCall::Launch(spec));
            inner.instances.insert(
                handle.clone(),
                RuntimeDescription {
                    state: RuntimeState::Running,
                    exit_code: None,
                    stopped_at_ms: None,
                },
            );
            Ok(handle)
        }

        async fn bind(&self, runtime_handle: &str, spec: LaunchSpec) -> Result<(), RuntimeAdapterError> {
            let mut inner = self.inner.lock();
            inner.calls.push(RuntimeCall::Bind {
                runtime_handle: runtime_handle.to_string(),
                spec,
            });
            if inner.reject_launches {
                return Err(RuntimeAdapterError::LaunchRejected("image not found".into()));
            }
            if !inner.instances.contains_key(runtime_handle) {
                return Err(RuntimeAdapterError::NotFound(runtime_handle.to_string()));
            }
            Ok(())
        }

        async fn stop(&self, runtime_handle: &str, reason: &str) -> Result<(), RuntimeAdapterError> {
            let mut inner = self.inner.lock();
            inner.calls.push(RuntimeCall::Stop {
                runtime_handle: runtime_handle.to_string(),
                reason: reason.to_string(),
            });
            if let Some(desc) = inner.instances.get_mut(runtime_handle) {
                desc.state = RuntimeState::Stopped;
            }
            Ok(())
        }

        async fn describe(
            &self,
            runtime_handle: &str,
        ) -> Result<RuntimeDescription, RuntimeAdapterError> {
            let mut inner = self.inner.lock();
            inner.calls.push(RuntimeCall::Describe {
                runtime_handle: runtime_handle.to_string(),
            });
            inner
                .instances
                .get(runtime_handle)
                .cloned()
                .ok_or_else(|| RuntimeAdapterError::NotFound(runtime_handle.to_string()))
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeContainerRuntime, RuntimeCall};

#[cfg(test)]
#[path = "container_runtime_tests.rs"]
mod tests;
