// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Internal storage failure modes (§7 "each crate defines its own error enum").

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("compression error: {0}")]
    Compress(String),
    #[error("dispatch {0} already exists")]
    Duplicate(String),
    #[error("not found")]
    NotFound,
    #[error("stale version: expected {expected}, found {found}")]
    StaleVersion { expected: u64, found: u64 },
    #[error("idempotency key already claimed")]
    AlreadyClaimed { dispatch_id: dispatch_core::DispatchId },
}
