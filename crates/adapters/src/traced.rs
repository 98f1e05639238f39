// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracing wrapper for [`ContainerRuntime`], the one external adapter whose
//! latency and failure modes matter for on-call debugging.

use crate::container_runtime::{ContainerRuntime, LaunchSpec, RuntimeAdapterError, RuntimeDescription};
use async_trait::async_trait;
use tracing::Instrument;

#[derive(Clone)]
pub struct TracedContainerRuntime<R> {
    inner: R,
}

impl<R> TracedContainerRuntime<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<R: ContainerRuntime> ContainerRuntime for TracedContainerRuntime<R> {
    async fn launch(&self, spec: LaunchSpec) -> Result<String, RuntimeAdapterError> {
        let image = spec.image.clone();
        async {
            let start = std::time::Instant::now();
            let result = self.inner.launch(spec).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(handle) => tracing::info!(runtime_handle = %handle, elapsed_ms, "launched"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "launch failed"),
            }
            result
        }
        .instrument(tracing::info_span!("runtime.launch", image))
        .await
    }

    async fn bind(&self, runtime_handle: &str, spec: LaunchSpec) -> Result<(), RuntimeAdapterError> {
        let result = self.inner.bind(runtime_handle, spec).await;
        tracing::info_span!("runtime.bind", runtime_handle).in_scope(|| match &result {
            Ok(()) => tracing::info!("bound"),
            Err(e) => tracing::error!(error = %e, "bind failed"),
        });
        result
    }

    async fn stop(&self, runtime_handle: &str, reason: &str) -> Result<(), RuntimeAdapterError> {
        let result = self.inner.stop(runtime_handle, reason).await;
        tracing::info_span!("runtime.stop", runtime_handle, reason).in_scope(|| match &result {
            Ok(()) => tracing::info!("stopped"),
            Err(e) => tracing::warn!(error = %e, "stop failed (may already be stopped)"),
        });
        result
    }

    async fn describe(
        &self,
        runtime_handle: &str,
    ) -> Result<RuntimeDescription, RuntimeAdapterError> {
        let result = self.inner.describe(runtime_handle).await;
        tracing::trace!(runtime_handle, state = ?result.as_ref().map(|d| d.state).ok(), "described");
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
