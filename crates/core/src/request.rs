// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Raw inbound dispatch request and its single-pass validation (§3.1, §9).

use crate::agent::{Agent, ModelRegistry};
use crate::dispatch::{Constraints, ContextLevel, WorkspaceMode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Minimum/maximum accepted `timeoutSeconds` (§3.1).
pub const MIN_TIMEOUT_SECONDS: u32 = 30;
pub const MAX_TIMEOUT_SECONDS: u32 = 86_400;

/// Minimum/maximum accepted `task` length in characters (§3.1).
pub const MIN_TASK_CHARS: usize = 10;
pub const MAX_TASK_CHARS: usize = 50_000;

/// Environment variable keys the control plane injects into every launch;
/// an `additionalSecrets` entry may not shadow one of these (§3.1, §6.5).
const BASE_ENV_KEYS: &[&str] = &[
    "PATH",
    "HOME",
    "OUTPOST_DISPATCH_ID",
    "OUTPOST_TENANT_ID",
    "OUTPOST_AGENT",
    "OUTPOST_MODEL_ID",
    "OUTPOST_TASK_TIMEOUT_SECONDS",
];

/// As received over the wire, before normalization (§3.1, §6.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub tenant_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    pub agent: String,
    pub model_id: String,
    pub task: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default)]
    pub context_level: Option<ContextLevel>,
    #[serde(default)]
    pub workspace_mode: Option<WorkspaceMode>,
    #[serde(default)]
    pub timeout_seconds: Option<u32>,
    #[serde(default)]
    pub constraints: Constraints,
    #[serde(default)]
    pub tags: HashMap<String, String>,
    #[serde(default)]
    pub additional_secrets: HashMap<String, String>,
}

/// Normalized, fully-validated request — the only form the dispatcher
/// algorithm (§4.6) is allowed to act on.
#[derive(Debug, Clone)]
pub struct ValidatedDispatchRequest {
    pub tenant_id: String,
    pub idempotency_key: Option<String>,
    pub agent: Agent,
    pub model_id: String,
    pub task: String,
    pub repo: Option<String>,
    pub branch: Option<String>,
    pub context_level: ContextLevel,
    pub workspace_mode: WorkspaceMode,
    pub timeout_seconds: u32,
    pub constraints: Constraints,
    pub tags: HashMap<String, String>,
    pub additional_secrets: HashMap<String, String>,
}

/// A single validation failure, collected by field so a caller can report
/// everything wrong with a request in one response rather than one error
/// at a time (§9: "a single validation pass over a schema object").
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {detail}")]
pub struct FieldError {
    pub field: &'static str,
    pub detail: String,
}

/// All validation failures found in one pass.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("request failed validation: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
pub struct ValidationErrors(pub Vec<FieldError>);

impl DispatchRequest {
    /// Validate and normalize in a single pass, collecting every violation
    /// rather than short-circuiting on the first one.
    pub fn validate(self, registry: &ModelRegistry) -> Result<ValidatedDispatchRequest, ValidationErrors> {
        let mut errors = Vec::new();

        if self.tenant_id.trim().is_empty() {
            errors.push(FieldError {
                field: "tenantId",
                detail: "must not be empty".into(),
            });
        }

        let agent: Option<Agent> = match self.agent.parse::<Agent>() {
            Ok(a) => Some(a),
            Err(e) => {
                errors.push(FieldError {
                    field: "agent",
                    detail: e.to_string(),
                });
                None
            }
        };

        let resolved_model_id = match agent {
            Some(a) => match registry.resolve(a, &self.model_id) {
                Ok(id) => Some(id),
                Err(e) => {
                    errors.push(FieldError {
                        field: "modelId",
                        detail: e.to_string(),
                    });
                    None
                }
            },
            None => None,
        };

        let task_len = self.task.chars().count();
        if task_len < MIN_TASK_CHARS || task_len > MAX_TASK_CHARS {
            errors.push(FieldError {
                field: "task",
                detail: format!(
                    "must be between {MIN_TASK_CHARS} and {MAX_TASK_CHARS} characters, got {task_len}"
                ),
            });
        }

        let timeout_seconds = self.timeout_seconds.unwrap_or(MIN_TIMEOUT_SECONDS.max(3600));
        if timeout_seconds < MIN_TIMEOUT_SECONDS || timeout_seconds > MAX_TIMEOUT_SECONDS {
            errors.push(FieldError {
                field: "timeoutSeconds",
                detail: format!(
                    "must be between {MIN_TIMEOUT_SECONDS} and {MAX_TIMEOUT_SECONDS}, got {timeout_seconds}"
                ),
            });
        }

        for key in self.additional_secrets.keys() {
            if key.starts_with("AWS_") || key.starts_with("OUTPOST_") {
                errors.push(FieldError {
                    field: "additionalSecrets",
                    detail: format!("key '{key}' uses a reserved prefix"),
                });
            } else if BASE_ENV_KEYS.contains(&key.as_str()) {
                errors.push(FieldError {
                    field: "additionalSecrets",
                    detail: format!("key '{key}' collides with a base environment variable"),
                });
            }
        }

        if let Some(idem) = &self.idempotency_key {
            if idem.trim().is_empty() {
                errors.push(FieldError {
                    field: "idempotencyKey",
                    detail: "must not be empty when present".into(),
                });
            }
        }

        match (errors.is_empty(), agent, resolved_model_id) {
            (true, Some(agent), Some(model_id)) => Ok(ValidatedDispatchRequest {
                tenant_id: self.tenant_id,
                idempotency_key: self.idempotency_key,
                agent,
                model_id,
                task: self.task,
                repo: self.repo,
                branch: self.branch,
                context_level: self.context_level.unwrap_or(ContextLevel::Standard),
                workspace_mode: self.workspace_mode.unwrap_or(WorkspaceMode::None),
                timeout_seconds,
                constraints: self.constraints,
                tags: self.tags,
                additional_secrets: self.additional_secrets,
            }),
            _ => Err(ValidationErrors(errors)),
        }
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
