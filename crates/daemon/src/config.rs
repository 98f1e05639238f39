// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration (§4.12): environment-variable-driven, with
//! hardcoded defaults and no schema-validation framework — mirroring the
//! engine crate's own `PoolConfig::default`.

use dispatch_core::Agent;
use dispatch_engine::PoolConfig;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Resolve the state directory: `DISPATCHD_STATE_DIR` > `XDG_STATE_HOME/dispatchd` > `~/.local/state/dispatchd`.
pub fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("DISPATCHD_STATE_DIR") {
        return PathBuf::from(dir);
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("dispatchd");
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".local/state/dispatchd")
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

/// Daemon-wide configuration (§4.12).
#[derive(Debug, Clone)]
pub struct DispatchdConfig {
    pub state_dir: PathBuf,
    /// Per-agent warm pool sizing; every agent not listed uses `PoolConfig::default`.
    pub pool_configs: HashMap<Agent, PoolConfig>,
    /// Per-tenant concurrent non-terminal dispatch ceiling (§4.6 step 3).
    pub default_tenant_quota: usize,
    pub idempotency_ttl_ms: u64,
    pub sweep_period: Duration,
    pub reap_period: Duration,
}

impl DispatchdConfig {
    /// Load configuration from the environment, falling back to the
    /// defaults named in §4.4/§4.6/§4.8.
    pub fn from_env() -> Self {
        Self {
            state_dir: state_dir(),
            pool_configs: HashMap::new(),
            default_tenant_quota: env_usize("DISPATCHD_TENANT_QUOTA", 20),
            idempotency_ttl_ms: env_u64("DISPATCHD_IDEMPOTENCY_TTL_MS", 24 * 60 * 60 * 1000),
            sweep_period: Duration::from_millis(env_u64("DISPATCHD_SWEEP_PERIOD_MS", 5 * 60 * 1000)),
            reap_period: Duration::from_millis(env_u64("DISPATCHD_REAP_PERIOD_MS", 60 * 1000)),
        }
    }
}

impl Default for DispatchdConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
