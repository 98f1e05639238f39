// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::container_runtime::{FakeContainerRuntime, MountSpec};
use std::collections::HashMap;

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
async fn traced_runtime_delegates_to_inner() {
    let fake = FakeContainerRuntime::new();
    let traced = TracedContainerRuntime::new(fake.clone());

    let handle = traced.launch(spec()).await.unwrap();
    let description = traced.describe(&handle).await.unwrap();
    assert_eq!(description.state, crate::container_runtime::RuntimeState::Running);

    traced.bind(&handle, spec()).await.unwrap();
    traced.stop(&handle, "done").await.unwrap();
    assert_eq!(fake.calls().len(), 4);
}
