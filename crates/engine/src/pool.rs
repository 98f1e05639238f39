// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`WarmPool`] (§4.4 C8): maintains target occupancy per agent, serves
//! acquire/release against [`PoolRepository`], and runs the replenish /
//! reaper maintenance operations.

use crate::error::EngineError;
use crate::launcher::TaskLauncher;
use dispatch_adapters::ContainerRuntime;
use dispatch_core::{Agent, DispatchId, PoolSlot, SlotId, SlotState};
use dispatch_storage::PoolRepository;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Per-agent pool sizing (§4.4, §4.12).
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub min_warm: usize,
    pub max_total: usize,
    pub warm_timeout_ms: u64,
    pub health_check_period_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_warm: 1,
            max_total: 4,
            warm_timeout_ms: 30 * 60 * 1000,
            health_check_period_ms: 60 * 1000,
        }
    }
}

pub struct WarmPool {
    repo: Arc<dyn PoolRepository>,
    runtime: Arc<dyn ContainerRuntime>,
    launcher: Arc<TaskLauncher>,
    configs: HashMap<Agent, PoolConfig>,
}

impl WarmPool {
    pub fn new(
        repo: Arc<dyn PoolRepository>,
        runtime: Arc<dyn ContainerRuntime>,
        launcher: Arc<TaskLauncher>,
        configs: HashMap<Agent, PoolConfig>,
    ) -> Self {
        Self {
            repo,
            runtime,
            launcher,
            configs,
        }
    }

    fn config_for(&self, agent: Agent) -> PoolConfig {
        self.configs.get(&agent).copied().unwrap_or_default()
    }

    /// `acquire(agent) -> slotId | EMPTY` (§4.4): selects the oldest WARM
    /// slot via a conditional WARM->ACQUIRED transition.
    pub async fn acquire(
        &self,
        agent: Agent,
        dispatch_id: DispatchId,
        now_ms: u64,
    ) -> Result<Option<SlotId>, EngineError> {
        Ok(self.repo.acquire_oldest_warm(agent, dispatch_id, now_ms).await?)
    }

    /// Release a slot back out of service (§4.4 release): transitions to
    /// RELEASING, best-effort stops the runtime, then drops the slot record
    /// and triggers replenishment. Releasing a slot the pool no longer
    /// knows about (already reaped, or never pool-owned) is a no-op.
    pub async fn release(&self, slot_id: &SlotId, now_ms: u64) -> Result<(), EngineError> {
        let slot = match self.repo.get(slot_id).await {
            Ok(slot) => slot,
            Err(dispatch_storage::StorageError::NotFound) => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        self.repo
            .transition(slot_id, SlotState::Releasing, now_ms, None)
            .await?;
        if let Err(e) = self.runtime.stop(slot_id.as_str(), "pool release").await {
            warn!(slot_id = %slot_id, error = %e, "stop failed during release (may already be stopped)");
        }
        self.repo.remove(slot_id).await?;
        self.replenish(slot.agent, now_ms).await?;
        Ok(())
    }

    /// `replenish(agent) -> void` (§4.4): if occupancy < minWarm, launch
    /// `minWarm - currentWarm` placeholder slots. Returns the number
    /// actually launched (callers don't need the count; tests do).
    pub async fn replenish(&self, agent: Agent, now_ms: u64) -> Result<usize, EngineError> {
        let config = self.config_for(agent);
        let warm_count = self
            .repo
            .count_by(agent, &[SlotState::Warming, SlotState::Warm])
            .await;
        let deficit = config.min_warm.saturating_sub(warm_count);
        let mut launched = 0;
        for _ in 0..deficit {
            let handle = match self.launcher.launch_placeholder(agent, self.runtime.as_ref()).await {
                Ok(handle) => handle,
                Err(e) => {
                    warn!(agent = %agent, error = %e, "placeholder launch failed during replenish");
                    break;
                }
            };
            let slot_id = SlotId::new(handle);
            let slot = PoolSlot::new_warming(slot_id.clone(), agent, now_ms, config.warm_timeout_ms);
            self.repo.create_slot(slot).await?;
            self.repo
                .transition(&slot_id, SlotState::Warm, now_ms, None)
                .await?;
            launched += 1;
        }
        if launched > 0 {
            info!(agent = %agent, launched, "replenished warm pool");
        }
        Ok(launched)
    }

    /// Periodic maintenance task (§4.4 reaper): recycle idle-expired WARM
    /// slots and mark health-stale slots RELEASING, then top back up to
    /// `minWarm`.
    pub async fn reap(&self, agent: Agent, now_ms: u64) -> Result<(), EngineError> {
        let config = self.config_for(agent);
        for slot in self.repo.list_by_agent(agent).await {
            if slot.state == SlotState::Releasing {
                continue;
            }
            if slot.is_idle_expired(now_ms) {
                self.release(&slot.slot_id, now_ms).await?;
            } else if slot.is_health_stale(now_ms, config.health_check_period_ms) {
                self.repo
                    .transition(&slot.slot_id, SlotState::Releasing, now_ms, None)
                    .await?;
            }
        }
        self.replenish(agent, now_ms).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
