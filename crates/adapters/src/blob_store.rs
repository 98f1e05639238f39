// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`BlobStore`] (§6.4): artifact upload and presigned retrieval.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BlobStoreError {
    #[error("blob not found: {0}")]
    NotFound(String),
    #[error("blob store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), BlobStoreError>;
    async fn presign(&self, key: &str, expires_in_secs: u64) -> Result<String, BlobStoreError>;
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;

    struct Object {
        bytes: Vec<u8>,
        content_type: String,
    }

    /// In-memory [`BlobStore`]. `presign` returns a deterministic
    /// `fake://<key>?expires_in=<n>` URL so tests can assert on it without
    /// a real signing scheme.
    #[derive(Clone, Default)]
    pub struct InMemoryBlobStore {
        objects: Arc<Mutex<HashMap<String, Object>>>,
        put_calls: Arc<Mutex<Vec<String>>>,
    }

    impl InMemoryBlobStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn get(&self, key: &str) -> Option<Vec<u8>> {
            self.objects.lock().get(key).map(|o| o.bytes.clone())
        }

        pub fn content_type(&self, key: &str) -> Option<String> {
            self.objects.lock().get(key).map(|o| o.content_type.clone())
        }

        /// Every key ever `put`, in call order (duplicates included) — used to
        /// assert idempotent re-upload doesn't create a second object under a
        /// different key.
        pub fn put_calls(&self) -> Vec<String> {
            self.put_calls.lock().clone()
        }
    }

    #[async_trait]
    impl BlobStore for InMemoryBlobStore {
        async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), BlobStoreError> {
            self.put_calls.lock().push(key.to_string());
            self.objects.lock().insert(
                key.to_string(),
                Object {
                    bytes,
                    content_type: content_type.to_string(),
                },
            );
            Ok(())
        }

        async fn presign(&self, key: &str, expires_in_secs: u64) -> Result<String, BlobStoreError> {
            if !self.objects.lock().contains_key(key) {
                return Err(BlobStoreError::NotFound(key.to_string()));
            }
            Ok(format!("fake://{key}?expires_in={expires_in_secs}"))
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::InMemoryBlobStore;

#[cfg(test)]
#[path = "blob_store_tests.rs"]
mod tests;
