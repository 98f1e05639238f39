// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`WorkspaceHandler`] (§4.5 workspace mount, §9 OQ2): decides the mount
//! mode for a dispatch's workspace and serializes persistent-mode access
//! per repo slug.
//!
//! OQ2 is resolved here: persistent workspaces share a named volume keyed
//! by `(tenantId, repoSlug)`, and concurrent dispatches targeting the same
//! slug are serialized rather than left to race on the working tree — a
//! dispatch holds the per-slug lock for the lifetime of its launch
//! composition, released once `TaskLauncher` has handed the mount spec to
//! the runtime.

use dispatch_adapters::MountSpec;
use dispatch_core::WorkspaceMode;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Derives a volume key's slug from a repo coordinate. Two different casings
/// or trailing-slash variants of the same repo must collide on one slug.
fn repo_slug(repo: &str) -> String {
    repo.trim()
        .trim_end_matches(".git")
        .trim_matches('/')
        .to_lowercase()
        .replace('/', "-")
}

/// Holds the per-(tenant, slug) lock table for persistent-mode mounts.
#[derive(Clone, Default)]
pub struct WorkspaceHandler {
    locks: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

/// Guards a named volume while its dispatch composes and launches; drop to
/// release it back to the next waiter on the same slug.
pub struct PersistentGuard {
    _guard: OwnedMutexGuard<()>,
    pub volume_key: String,
}

impl WorkspaceHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide the mount for a dispatch (§4.5): `none` → empty tmpfs,
    /// `minimal` → sparse-cloned repo, `full` → full shallow clone,
    /// `persistent` → named volume keyed by `(tenantId, repoSlug)`.
    pub fn mount_for(
        &self,
        mode: WorkspaceMode,
        tenant_id: &str,
        repo: Option<&str>,
        branch: Option<&str>,
    ) -> MountSpec {
        match mode {
            WorkspaceMode::None => MountSpec::Empty,
            WorkspaceMode::Minimal => MountSpec::SparseClone {
                repo: repo.unwrap_or_default().to_string(),
                branch: branch.map(str::to_string),
            },
            WorkspaceMode::Full => MountSpec::FullClone {
                repo: repo.unwrap_or_default().to_string(),
                branch: branch.map(str::to_string),
            },
            WorkspaceMode::Persistent => MountSpec::NamedVolume {
                volume_key: self.volume_key(tenant_id, repo.unwrap_or_default()),
            },
        }
    }

    pub fn volume_key(&self, tenant_id: &str, repo: &str) -> String {
        format!("{tenant_id}/{}", repo_slug(repo))
    }

    /// Acquire the serialization lock for a persistent volume key (OQ2).
    /// Holds the returned guard for as long as the caller's launch
    /// composition needs exclusive access to the working tree.
    pub async fn lock_volume(&self, volume_key: &str) -> PersistentGuard {
        let mutex = {
            let mut locks = self.locks.lock();
            locks
                .entry(volume_key.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        let guard = mutex.lock_owned().await;
        PersistentGuard {
            _guard: guard,
            volume_key: volume_key.to_string(),
        }
    }
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;
