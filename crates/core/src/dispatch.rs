// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The [`Dispatch`] record and its state machine (§3.1, §4.1).

use crate::agent::Agent;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

crate::define_id! {
    /// Opaque, lexicographically-sortable (time-prefixed) dispatch identifier.
    pub struct DispatchId;
}

crate::define_id! {
    /// Opaque tenant handle (partition-key semantic).
    pub struct TenantId;
}

/// How much surrounding repository context the agent container receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextLevel {
    Minimal,
    Standard,
    Full,
}

/// Workspace mount mode (§4.5 TaskLauncher workspace mount).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkspaceMode {
    None,
    Minimal,
    Full,
    Persistent,
}

/// Optional per-dispatch resource caps, bounded within per-agent tier
/// ceilings at launch time (§4.5).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_memory_mb: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_cpu_units: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_disk_gb: Option<u32>,
}

/// Dispatch lifecycle status (§4.1). Terminal: `Success`, `Failed`,
/// `Timeout`, `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DispatchStatus {
    Pending,
    Provisioning,
    Running,
    Completing,
    Success,
    Failed,
    Timeout,
    Cancelled,
}

impl DispatchStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DispatchStatus::Success
                | DispatchStatus::Failed
                | DispatchStatus::Timeout
                | DispatchStatus::Cancelled
        )
    }

    /// Whether `self -> next` is an allowed transition per the §4.1 diagram.
    pub fn can_transition_to(&self, next: DispatchStatus) -> bool {
        use DispatchStatus::*;
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (Pending, Provisioning)
                | (Pending, Cancelled)
                | (Pending, Failed)
                | (Provisioning, Running)
                | (Provisioning, Failed)
                | (Provisioning, Timeout)
                | (Provisioning, Cancelled)
                | (Running, Completing)
                | (Running, Failed)
                | (Running, Timeout)
                | (Running, Cancelled)
                | (Completing, Success)
                | (Completing, Failed)
        )
    }
}

impl fmt::Display for DispatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DispatchStatus::Pending => "PENDING",
            DispatchStatus::Provisioning => "PROVISIONING",
            DispatchStatus::Running => "RUNNING",
            DispatchStatus::Completing => "COMPLETING",
            DispatchStatus::Success => "SUCCESS",
            DispatchStatus::Failed => "FAILED",
            DispatchStatus::Timeout => "TIMEOUT",
            DispatchStatus::Cancelled => "CANCELLED",
        };
        write!(f, "{s}")
    }
}

/// The central entity (§3.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dispatch {
    pub dispatch_id: DispatchId,
    pub tenant_id: TenantId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    pub agent: Agent,
    pub model_id: String,
    pub task: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    pub context_level: ContextLevel,
    pub workspace_mode: WorkspaceMode,
    pub timeout_seconds: u32,
    #[serde(default)]
    pub constraints: Constraints,
    #[serde(default)]
    pub tags: HashMap<String, String>,
    #[serde(default)]
    pub additional_secrets: HashMap<String, String>,
    pub status: DispatchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_handle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_handle: Option<String>,
    pub version: u64,
    pub created_at_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at_ms: Option<u64>,
    pub ttl_ms: u64,
}

/// Default idempotency-window TTL (§4.3): 24h.
pub const IDEMPOTENCY_TTL_MS: u64 = 24 * 60 * 60 * 1000;
/// Default dispatch-record TTL (§3.1): +30 days.
pub const DISPATCH_TTL_MS: u64 = 30 * 24 * 60 * 60 * 1000;

impl Dispatch {
    /// Construct a new PENDING dispatch at `version = 1` (§4.6 step 5).
    #[allow(clippy::too_many_arguments)]
    pub fn new_pending(
        dispatch_id: DispatchId,
        tenant_id: TenantId,
        idempotency_key: Option<String>,
        agent: Agent,
        model_id: String,
        task: String,
        repo: Option<String>,
        branch: Option<String>,
        context_level: ContextLevel,
        workspace_mode: WorkspaceMode,
        timeout_seconds: u32,
        constraints: Constraints,
        tags: HashMap<String, String>,
        additional_secrets: HashMap<String, String>,
        now_ms: u64,
    ) -> Self {
        Self {
            dispatch_id,
            tenant_id,
            idempotency_key,
            agent,
            model_id,
            task,
            repo,
            branch,
            context_level,
            workspace_mode,
            timeout_seconds,
            constraints,
            tags,
            additional_secrets,
            status: DispatchStatus::Pending,
            runtime_handle: None,
            exit_code: None,
            error_kind: None,
            error_message: None,
            artifact_handle: None,
            version: 1,
            created_at_ms: now_ms,
            started_at_ms: None,
            ended_at_ms: None,
            ttl_ms: now_ms + DISPATCH_TTL_MS,
        }
    }

    /// Apply a status transition in place, enforcing §4.1's allowed-successor
    /// table and §3.1's invariant that `endedAt` is set iff terminal.
    ///
    /// The caller is responsible for version-conditional persistence (§4.2);
    /// this method only mutates the in-memory value and bumps `version`.
    pub fn transition(&mut self, next: DispatchStatus, now_ms: u64) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionError {
                from: self.status,
                to: next,
            });
        }
        if next == DispatchStatus::Provisioning || next == DispatchStatus::Running {
            self.started_at_ms.get_or_insert(now_ms);
        }
        self.status = next;
        self.version += 1;
        if next.is_terminal() {
            self.ended_at_ms = Some(now_ms);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot transition dispatch from {from} to {to}")]
pub struct TransitionError {
    pub from: DispatchStatus,
    pub to: DispatchStatus,
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
