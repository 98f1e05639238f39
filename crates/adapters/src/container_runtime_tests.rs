// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn spec() -> LaunchSpec {
    LaunchSpec {
        image: "codex:latest".into(),
        env: HashMap::new(),
        mount: MountSpec::Empty,
        max_memory_mb: None,
        max_cpu_units: None,
        max_disk_gb: None,
        dispatch_id: None,
        tags: HashMap::new(),
    }
}

#[tokio::test]
async fn launch_then_describe_reports_running() {
    let runtime = FakeContainerRuntime::new();
    let handle = runtime.launch(spec()).await.unwrap();
    let description = runtime.describe(&handle).await.unwrap();
    assert_eq!(description.state, RuntimeState::Running);
}

#[tokio::test]
async fn stop_is_idempotent() {
    let runtime = FakeContainerRuntime::new();
    let handle = runtime.launch(spec()).await.unwrap();
    runtime.stop(&handle, "user requested").await.unwrap();
    runtime.stop(&handle, "user requested").await.unwrap();
    let description = runtime.describe(&handle).await.unwrap();
    assert_eq!(description.state, RuntimeState::Stopped);
}

#[tokio::test]
async fn launch_rejected_surfaces_launch_rejected_error() {
    let runtime = FakeContainerRuntime::new();
    runtime.set_reject_launches(true);
    let err = runtime.launch(spec()).await.unwrap_err();
    assert!(matches!(err, RuntimeAdapterError::LaunchRejected(_)));
}

#[tokio::test]
async fn launch_at_capacity_surfaces_capacity_error() {
    let runtime = FakeContainerRuntime::new();
    runtime.set_at_capacity(true);
    let err = runtime.launch(spec()).await.unwrap_err();
    assert!(matches!(err, RuntimeAdapterError::Capacity));
}

#[tokio::test]
async fn bind_reconfigures_a_running_instance_without_launching_again() {
    let runtime = FakeContainerRuntime::new();
    let handle = runtime.launch(spec()).await.unwrap();
    runtime.bind(&handle, spec()).await.unwrap();
    assert_eq!(runtime.calls().len(), 2);
    assert!(matches!(runtime.calls()[1], RuntimeCall::Bind { .. }));
}

#[tokio::test]
async fn bind_unknown_handle_is_not_found() {
    let runtime = FakeContainerRuntime::new();
    let err = runtime.bind("ctr-missing", spec()).await.unwrap_err();
    assert!(matches!(err, RuntimeAdapterError::NotFound(_)));
}

#[tokio::test]
async fn describe_unknown_handle_is_not_found() {
    let runtime = FakeContainerRuntime::new();
    let err = runtime.describe("ctr-missing").await.unwrap_err();
    assert!(matches!(err, RuntimeAdapterError::NotFound(_)));
}
