// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn tier_alias_resolves_to_concrete_flagship_id() {
    let registry = ModelRegistry::with_defaults();
    let resolved = registry.resolve(Agent::Aider, "flagship").unwrap();
    assert_eq!(resolved, "aider-flagship-1");
}

#[test]
fn concrete_id_passes_through_when_allow_listed() {
    let registry = ModelRegistry::with_defaults();
    let resolved = registry.resolve(Agent::Claude, "claude-balanced-1").unwrap();
    assert_eq!(resolved, "claude-balanced-1");
}

#[test]
fn unknown_model_is_rejected() {
    let registry = ModelRegistry::with_defaults();
    let err = registry.resolve(Agent::Claude, "made-up-model").unwrap_err();
    assert_eq!(err.agent, "claude");
    assert_eq!(err.model_id, "made-up-model");
}

#[test]
fn agent_round_trips_through_display_and_from_str() {
    for agent in Agent::ALL {
        let s = agent.to_string();
        let parsed: Agent = s.parse().unwrap();
        assert_eq!(parsed, agent);
    }
}

#[test]
fn unknown_agent_string_is_rejected() {
    assert!("not-an-agent".parse::<Agent>().is_err());
}
