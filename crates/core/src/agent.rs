// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent worker classes and per-agent model registries.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A named worker class; determines image, resource tier, and model
/// registry (GLOSSARY). Closed set per deployment (§3.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Agent {
    Claude,
    Codex,
    Gemini,
    Aider,
    Grok,
}

impl Agent {
    pub const ALL: [Agent; 5] = [
        Agent::Claude,
        Agent::Codex,
        Agent::Gemini,
        Agent::Aider,
        Agent::Grok,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Agent::Claude => "claude",
            Agent::Codex => "codex",
            Agent::Gemini => "gemini",
            Agent::Aider => "aider",
            Agent::Grok => "grok",
        }
    }
}

impl fmt::Display for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Agent {
    type Err = UnknownAgent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "claude" => Ok(Agent::Claude),
            "codex" => Ok(Agent::Codex),
            "gemini" => Ok(Agent::Gemini),
            "aider" => Ok(Agent::Aider),
            "grok" => Ok(Agent::Grok),
            other => Err(UnknownAgent(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown agent: {0}")]
pub struct UnknownAgent(pub String);

/// A tier alias, per GLOSSARY: resolves to a concrete model id via a
/// per-agent registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelTier {
    Flagship,
    Balanced,
    Fast,
}

impl std::str::FromStr for ModelTier {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flagship" => Ok(ModelTier::Flagship),
            "balanced" => Ok(ModelTier::Balanced),
            "fast" => Ok(ModelTier::Fast),
            _ => Err(()),
        }
    }
}

/// Per-agent table mapping tier aliases to concrete model ids, plus the set
/// of concrete ids the agent accepts directly.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    tiers: HashMap<Agent, HashMap<ModelTier, String>>,
    concrete: HashMap<Agent, Vec<String>>,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("model '{model_id}' is not allowed for agent '{agent}'")]
pub struct UnknownModel {
    pub agent: String,
    pub model_id: String,
}

impl ModelRegistry {
    /// A registry with one flagship/balanced/fast concrete id per agent
    /// (B3: `modelId = "flagship"` resolves to the agent's configured
    /// flagship concrete id). Deployments override this with real catalogs;
    /// these defaults exist so the control plane is runnable out of the box.
    pub fn with_defaults() -> Self {
        let mut tiers = HashMap::new();
        let mut concrete = HashMap::new();
        for agent in Agent::ALL {
            let prefix = agent.as_str();
            let mut tier_map = HashMap::new();
            let flagship = format!("{prefix}-flagship-1");
            let balanced = format!("{prefix}-balanced-1");
            let fast = format!("{prefix}-fast-1");
            tier_map.insert(ModelTier::Flagship, flagship.clone());
            tier_map.insert(ModelTier::Balanced, balanced.clone());
            tier_map.insert(ModelTier::Fast, fast.clone());
            tiers.insert(agent, tier_map);
            concrete.insert(agent, vec![flagship, balanced, fast]);
        }
        Self { tiers, concrete }
    }

    /// Resolve a raw `modelId` (tier alias or concrete id) for `agent`.
    pub fn resolve(&self, agent: Agent, model_id: &str) -> Result<String, UnknownModel> {
        if let Ok(tier) = model_id.parse::<ModelTier>() {
            if let Some(resolved) = self.tiers.get(&agent).and_then(|m| m.get(&tier)) {
                return Ok(resolved.clone());
            }
        }
        if self
            .concrete
            .get(&agent)
            .is_some_and(|ids| ids.iter().any(|id| id == model_id))
        {
            return Ok(model_id.to_string());
        }
        Err(UnknownModel {
            agent: agent.to_string(),
            model_id: model_id.to_string(),
        })
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
