// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Caller-visible error taxonomy (§7).
//!
//! `StaleVersion` and `Transient` are deliberately absent: per §7 they are
//! internal-only and must be fully handled (retried, or classified into one
//! of the kinds below) before a [`DispatchError`] is constructed.

use thiserror::Error;

/// Caller-visible error kinds, matching the §7 taxonomy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DispatchError {
    /// Request fails §3.1 constraints. Not retried.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Tenant concurrency quota exceeded.
    #[error("tenant concurrency quota exceeded")]
    Quota,

    /// Warm pool empty and cold launch reports capacity exhaustion.
    #[error("no capacity available, retry after {retry_after_secs}s")]
    Unavailable { retry_after_secs: u64 },

    /// No such dispatch/slot/secret.
    #[error("not found")]
    NotFound,

    /// State-machine violation (e.g. cancel on a terminal dispatch).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Runtime rejected the launch spec for a deterministic reason.
    #[error("launch rejected: {0}")]
    Launch(String),

    /// Sweeper could not describe a runtime handle.
    #[error("runtime lost: {0}")]
    RuntimeLost(String),

    /// Artifact publication failed after a terminal-success transition.
    #[error("artifact publication failed: {0}")]
    Artifact(String),

    /// Catch-all; logged with a correlation id, surfaced as opaque.
    #[error("internal error")]
    Internal(String),
}

impl DispatchError {
    /// The `errorKind` string persisted on a terminal dispatch record (§3.1, §7).
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::Validation(_) => "VALIDATION",
            DispatchError::Quota => "QUOTA",
            DispatchError::Unavailable { .. } => "UNAVAILABLE",
            DispatchError::NotFound => "NOT_FOUND",
            DispatchError::Conflict(_) => "CONFLICT",
            DispatchError::Launch(_) => "LAUNCH",
            DispatchError::RuntimeLost(_) => "RUNTIME_LOST",
            DispatchError::Artifact(_) => "ARTIFACT",
            DispatchError::Internal(_) => "INTERNAL",
        }
    }

    /// A human-readable message safe to persist as `errorMessage` — callers
    /// must never pass secret material into this constructor (§6.5).
    pub fn message(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
