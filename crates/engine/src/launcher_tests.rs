// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use dispatch_adapters::{FakeContainerRuntime, FakeSecretSource, RuntimeCall};
use dispatch_core::{Agent, Constraints, ContextLevel, Dispatch, DispatchId, TenantId, WorkspaceMode};
use std::collections::HashMap;

fn sample_dispatch(workspace_mode: WorkspaceMode, additional_secrets: HashMap<String, String>) -> Dispatch {
    Dispatch::new_pending(
        DispatchId::new("d1"),
        TenantId::new("t1"),
        None,
        Agent::Aider,
        "aider-flagship-1".to_string(),
        "echo hi".to_string(),
        Some("org/repo".to_string()),
        Some("main".to_string()),
        ContextLevel::Standard,
        workspace_mode,
        60,
        Constraints::default(),
        HashMap::new(),
        additional_secrets,
        1_000,
    )
}

#[tokio::test]
async fn launch_embeds_metadata_and_resolves_secrets() {
    let runtime = FakeContainerRuntime::new();
    let secrets = FakeSecretSource::new();
    secrets.put("vault://token", b"s3cr3t".to_vec());
    let launcher = TaskLauncher::new(AgentCatalog::with_defaults(), WorkspaceHandler::new());

    let mut additional = HashMap::new();
    additional.insert("MY_TOKEN".to_string(), "vault://token".to_string());
    let dispatch = sample_dispatch(WorkspaceMode::Minimal, additional);

    let handle = launcher.launch(&dispatch, &runtime, &secrets).await.unwrap();
    assert_eq!(handle, "ctr-1");

    let calls = runtime.calls();
    let RuntimeCall::Launch(spec) = &calls[0] else {
        panic!("expected a Launch call");
    };
    assert_eq!(spec.env.get("MY_TOKEN").map(String::as_str), Some("s3cr3t"));
    assert_eq!(spec.env.get("OUTPOST_DISPATCH_ID").map(String::as_str), Some("d1"));
    assert_eq!(spec.dispatch_id, Some(DispatchId::new("d1")));
    assert_eq!(spec.tags.get("tenant_id").map(String::as_str), Some("t1"));
}

#[tokio::test]
async fn launch_rejects_constraints_above_tier_ceiling() {
    let runtime = FakeContainerRuntime::new();
    let secrets = FakeSecretSource::new();
    let launcher = TaskLauncher::new(AgentCatalog::with_defaults(), WorkspaceHandler::new());

    let mut dispatch = sample_dispatch(WorkspaceMode::None, HashMap::new());
    dispatch.constraints.max_memory_mb = Some(1_000_000);

    let err = launcher.launch(&dispatch, &runtime, &secrets).await.unwrap_err();
    assert!(matches!(err, EngineError::LaunchRejected(_)));
    assert!(runtime.calls().is_empty());
}

#[tokio::test]
async fn launch_with_unresolvable_secret_fails_without_launching() {
    let runtime = FakeContainerRuntime::new();
    let secrets = FakeSecretSource::new();
    let launcher = TaskLauncher::new(AgentCatalog::with_defaults(), WorkspaceHandler::new());

    let mut additional = HashMap::new();
    additional.insert("MY_TOKEN".to_string(), "vault://missing".to_string());
    let dispatch = sample_dispatch(WorkspaceMode::None, additional);

    let err = launcher.launch(&dispatch, &runtime, &secrets).await.unwrap_err();
    assert!(matches!(err, EngineError::Secret(_)));
    assert!(runtime.calls().is_empty());
}

#[tokio::test]
async fn launch_placeholder_carries_no_dispatch_metadata() {
    let runtime = FakeContainerRuntime::new();
    let launcher = TaskLauncher::new(AgentCatalog::with_defaults(), WorkspaceHandler::new());

    launcher.launch_placeholder(Agent::Aider, &runtime).await.unwrap();

    let calls = runtime.calls();
    let RuntimeCall::Launch(spec) = &calls[0] else {
        panic!("expected a Launch call");
    };
    assert_eq!(spec.dispatch_id, None);
    assert!(spec.env.is_empty());
}

#[tokio::test]
async fn launch_failure_surfaces_runtime_rejection() {
    let runtime = FakeContainerRuntime::new();
    runtime.set_reject_launches(true);
    let secrets = FakeSecretSource::new();
    let launcher = TaskLauncher::new(AgentCatalog::with_defaults(), WorkspaceHandler::new());
    let dispatch = sample_dispatch(WorkspaceMode::None, HashMap::new());

    let err = launcher.launch(&dispatch, &runtime, &secrets).await.unwrap_err();
    assert!(matches!(err, EngineError::LaunchRejected(_)));
}

#[tokio::test]
async fn bind_reconfigures_the_warm_slot_without_a_second_launch() {
    let runtime = FakeContainerRuntime::new();
    let secrets = FakeSecretSource::new();
    secrets.put("vault://token", b"s3cr3t".to_vec());
    let launcher = TaskLauncher::new(AgentCatalog::with_defaults(), WorkspaceHandler::new());

    let placeholder_handle = launcher.launch_placeholder(Agent::Aider, &runtime).await.unwrap();

    let mut additional = HashMap::new();
    additional.insert("MY_TOKEN".to_string(), "vault://token".to_string());
    let dispatch = sample_dispatch(WorkspaceMode::Minimal, additional);

    let bound_handle = launcher
        .bind(&dispatch, &placeholder_handle, &runtime, &secrets)
        .await
        .unwrap();
    assert_eq!(bound_handle, placeholder_handle);

    let calls = runtime.calls();
    assert_eq!(calls.len(), 2, "placeholder launch plus one bind, no second launch");
    let RuntimeCall::Bind { runtime_handle, spec } = &calls[1] else {
        panic!("expected a Bind call");
    };
    assert_eq!(runtime_handle, &placeholder_handle);
    assert_eq!(spec.env.get("MY_TOKEN").map(String::as_str), Some("s3cr3t"));
    assert_eq!(spec.dispatch_id, Some(DispatchId::new("d1")));
    assert_eq!(spec.tags.get("tenant_id").map(String::as_str), Some("t1"));
}

#[tokio::test]
async fn bind_still_rejects_constraints_above_tier_ceiling() {
    let runtime = FakeContainerRuntime::new();
    let secrets = FakeSecretSource::new();
    let launcher = TaskLauncher::new(AgentCatalog::with_defaults(), WorkspaceHandler::new());
    let placeholder_handle = launcher.launch_placeholder(Agent::Aider, &runtime).await.unwrap();

    let mut dispatch = sample_dispatch(WorkspaceMode::None, HashMap::new());
    dispatch.constraints.max_memory_mb = Some(1_000_000);

    let err = launcher
        .bind(&dispatch, &placeholder_handle, &runtime, &secrets)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::LaunchRejected(_)));
    assert_eq!(runtime.calls().len(), 1, "only the placeholder launch, no bind call");
}
