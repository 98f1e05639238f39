// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`FleetMetrics`] (§4.9): a single snapshot operation over pool occupancy
//! and recent dispatch counts, cached with an explicit TTL (§9: "per-process
//! caches must have an explicit TTL and no eviction-at-a-distance").

use dispatch_core::{Agent, DispatchStatus, SlotState};
use dispatch_storage::{DispatchRepository, PoolRepository};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// How long a snapshot may be served before a fresh one is computed.
const CACHE_TTL_MS: u64 = 30_000;

/// Occupancy counters for one agent's warm pool (§4.9).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentPoolCounts {
    pub warm: usize,
    pub acquired: usize,
    pub releasing: usize,
    pub failing_health_check_rate: f64,
}

/// Full fleet snapshot returned by `fleetStatus` (§6.1).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FleetSnapshot {
    pub pool: HashMap<Agent, AgentPoolCounts>,
    /// Per-agent dispatch counts by status (display name), createdAt within
    /// the last hour.
    pub recent_dispatches: HashMap<Agent, HashMap<String, usize>>,
    pub computed_at_ms: u64,
}

struct Cached {
    snapshot: FleetSnapshot,
    computed_at_ms: u64,
}

pub struct FleetMetrics {
    repo: Arc<dyn DispatchRepository>,
    pool_repo: Arc<dyn PoolRepository>,
    cached: Mutex<Option<Cached>>,
}

impl FleetMetrics {
    pub fn new(repo: Arc<dyn DispatchRepository>, pool_repo: Arc<dyn PoolRepository>) -> Self {
        Self {
            repo,
            pool_repo,
            cached: Mutex::new(None),
        }
    }

    /// Returns a cached snapshot if younger than [`CACHE_TTL_MS`], otherwise
    /// recomputes one (§4.9, §9).
    pub async fn snapshot(&self, now_ms: u64) -> FleetSnapshot {
        if let Some(cached) = self.cached.lock().as_ref() {
            if now_ms.saturating_sub(cached.computed_at_ms) < CACHE_TTL_MS {
                return cached.snapshot.clone();
            }
        }

        let snapshot = self.compute(now_ms).await;
        *self.cached.lock() = Some(Cached {
            snapshot: snapshot.clone(),
            computed_at_ms: now_ms,
        });
        snapshot
    }

    async fn compute(&self, now_ms: u64) -> FleetSnapshot {
        let mut pool = HashMap::new();
        for agent in Agent::ALL {
            let slots = self.pool_repo.list_by_agent(agent).await;
            if slots.is_empty() {
                continue;
            }
            let warm = slots.iter().filter(|s| s.state == SlotState::Warm).count();
            let acquired = slots.iter().filter(|s| s.state == SlotState::Acquired).count();
            let releasing = slots.iter().filter(|s| s.state == SlotState::Releasing).count();
            let non_acquired = slots.iter().filter(|s| s.state != SlotState::Acquired).count();
            let stale = slots
                .iter()
                .filter(|s| s.state != SlotState::Acquired && s.is_health_stale(now_ms, 60_000))
                .count();
            let failing_health_check_rate = if non_acquired == 0 {
                0.0
            } else {
                stale as f64 / non_acquired as f64
            };
            pool.insert(
                agent,
                AgentPoolCounts {
                    warm,
                    acquired,
                    releasing,
                    failing_health_check_rate,
                },
            );
        }

        let mut recent_dispatches: HashMap<Agent, HashMap<String, usize>> = HashMap::new();
        let one_hour_ago = now_ms.saturating_sub(60 * 60 * 1000);
        for status in [
            DispatchStatus::Pending,
            DispatchStatus::Provisioning,
            DispatchStatus::Running,
            DispatchStatus::Completing,
            DispatchStatus::Success,
            DispatchStatus::Failed,
            DispatchStatus::Timeout,
            DispatchStatus::Cancelled,
        ] {
            let matches = self
                .repo
                .query_by_status(status, u64::MAX)
                .await
                .unwrap_or_default();
            for dispatch in matches {
                if dispatch.created_at_ms < one_hour_ago {
                    continue;
                }
                *recent_dispatches
                    .entry(dispatch.agent)
                    .or_default()
                    .entry(status.to_string())
                    .or_insert(0) += 1;
            }
        }

        FleetSnapshot {
            pool,
            recent_dispatches,
            computed_at_ms: now_ms,
        }
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
