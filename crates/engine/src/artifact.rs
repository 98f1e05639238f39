// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`ArtifactPublisher`] (§4.10): promotes workspace outputs to the blob
//! store on a terminal transition and records a retrievable handle.
//!
//! Collecting `stdout`/`diff` bytes out of a live container workspace is
//! opaque container-internal machinery (§1 Non-goals: "the inner execution
//! of agents"); this publisher takes already-collected bytes and owns only
//! the upload/idempotency/key-derivation contract.

use crate::error::EngineError;
use dispatch_adapters::BlobStore;
use dispatch_core::Dispatch;
use serde_json::json;
use std::sync::Arc;

/// Default presign lifetime handed back to `getArtifacts` callers (§6.1).
const DEFAULT_EXPIRY_SECS: u64 = 3600;

pub struct ArtifactPublisher {
    blob_store: Arc<dyn BlobStore>,
}

impl ArtifactPublisher {
    pub fn new(blob_store: Arc<dyn BlobStore>) -> Self {
        Self { blob_store }
    }

    /// The opaque `artifactHandle` for a dispatch: a stable key prefix
    /// derived only from `dispatchId`, so re-publishing overwrites the same
    /// three objects rather than creating duplicates (L2).
    pub fn handle_for(dispatch_id: &str) -> String {
        format!("dispatches/{dispatch_id}")
    }

    /// Upload `(stdout, diff, metadata.json)` under the dispatch's
    /// deterministic prefix and return the `artifactHandle`. Safe to call
    /// more than once for the same dispatch (§4.10, L2).
    pub async fn publish(
        &self,
        dispatch: &Dispatch,
        stdout: Vec<u8>,
        diff: Vec<u8>,
    ) -> Result<String, EngineError> {
        let prefix = Self::handle_for(dispatch.dispatch_id.as_str());
        let metadata = json!({
            "dispatchId": dispatch.dispatch_id.as_str(),
            "tenantId": dispatch.tenant_id.as_str(),
            "agent": dispatch.agent.as_str(),
            "status": dispatch.status.to_string(),
            "exitCode": dispatch.exit_code,
        });
        let metadata_bytes = serde_json::to_vec_pretty(&metadata)
            .map_err(|e| EngineError::Internal(format!("metadata serialization failed: {e}")))?;

        self.blob_store
            .put(&format!("{prefix}/stdout.log"), stdout, "text/plain")
            .await?;
        self.blob_store
            .put(&format!("{prefix}/diff.patch"), diff, "text/x-diff")
            .await?;
        self.blob_store
            .put(&format!("{prefix}/metadata.json"), metadata_bytes, "application/json")
            .await?;

        Ok(prefix)
    }

    /// Presigned URLs for each object under a dispatch's artifact handle
    /// (backs the `getArtifacts` operation, §6.1).
    pub async fn presign_all(&self, artifact_handle: &str) -> Result<Vec<(String, String)>, EngineError> {
        let mut out = Vec::new();
        for (kind, name) in [("stdout", "stdout.log"), ("diff", "diff.patch"), ("metadata", "metadata.json")] {
            let key = format!("{artifact_handle}/{name}");
            let url = self.blob_store.presign(&key, DEFAULT_EXPIRY_SECS).await?;
            out.push((kind.to_string(), url));
        }
        Ok(out)
    }
}

#[cfg(test)]
#[path = "artifact_tests.rs"]
mod tests;
