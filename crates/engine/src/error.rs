// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Internal failure modes for the engine crate (§7 "each crate defines its
//! own error enum"). [`EngineError`] never crosses the caller-visible
//! boundary directly — `dispatch-daemon` classifies it into a
//! [`dispatch_core::DispatchError`] per §7's propagation policy.

use dispatch_adapters::{BlobStoreError, RuntimeAdapterError, SecretSourceError};
use dispatch_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("runtime rejected launch: {0}")]
    LaunchRejected(String),

    #[error("no launch capacity available")]
    Capacity,

    #[error("secret unavailable: {0}")]
    Secret(String),

    #[error("artifact publication failed: {0}")]
    Artifact(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl From<RuntimeAdapterError> for EngineError {
    fn from(e: RuntimeAdapterError) -> Self {
        match e {
            RuntimeAdapterError::LaunchRejected(msg) => EngineError::LaunchRejected(msg),
            RuntimeAdapterError::Capacity => EngineError::Capacity,
            RuntimeAdapterError::NotFound(msg) => EngineError::NotFound(msg),
            RuntimeAdapterError::Other(msg) => EngineError::Internal(msg),
        }
    }
}

impl From<SecretSourceError> for EngineError {
    fn from(e: SecretSourceError) -> Self {
        match e {
            SecretSourceError::NotFound => EngineError::Secret("not found".to_string()),
            SecretSourceError::Unavailable(msg) => EngineError::Secret(msg),
        }
    }
}

impl From<BlobStoreError> for EngineError {
    fn from(e: BlobStoreError) -> Self {
        match e {
            BlobStoreError::NotFound(key) => EngineError::Artifact(format!("missing object {key}")),
            BlobStoreError::Unavailable(msg) => EngineError::Artifact(msg),
        }
    }
}
