// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`SecretSource`] (§6.5): resolve agent and tenant-additional secrets by
//! handle. Resolved values must never appear in logs, tags, or error
//! messages; only handles are audited.

use async_trait::async_trait;
use thiserror::Error;

/// Deliberately not `Debug`/`Display` so a resolved secret can't be
/// logged by accident via `{:?}` in an enclosing struct.
#[derive(Clone)]
pub struct SecretBytes(Vec<u8>);

impl SecretBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn expose(&self) -> &[u8] {
        &self.0
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SecretSourceError {
    #[error("secret handle not found")]
    NotFound,
    #[error("secret source unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait SecretSource: Send + Sync {
    async fn resolve(&self, handle: &str) -> Result<SecretBytes, SecretSourceError>;
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;

    /// In-memory [`SecretSource`]; records the handles resolved (never the
    /// values) so tests can assert no plaintext secret leaked into a tag.
    #[derive(Clone, Default)]
    pub struct FakeSecretSource {
        secrets: Arc<Mutex<HashMap<String, Vec<u8>>>>,
        resolved_handles: Arc<Mutex<Vec<String>>>,
    }

    impl FakeSecretSource {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn put(&self, handle: impl Into<String>, value: impl Into<Vec<u8>>) {
            self.secrets.lock().insert(handle.into(), value.into());
        }

        pub fn resolved_handles(&self) -> Vec<String> {
            self.resolved_handles.lock().clone()
        }
    }

    #[async_trait]
    impl SecretSource for FakeSecretSource {
        async fn resolve(&self, handle: &str) -> Result<SecretBytes, SecretSourceError> {
            self.resolved_handles.lock().push(handle.to_string());
            self.secrets
                .lock()
                .get(handle)
                .cloned()
                .map(SecretBytes::new)
                .ok_or(SecretSourceError::NotFound)
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeSecretSource;

#[cfg(test)]
#[path = "secret_source_tests.rs"]
mod tests;
