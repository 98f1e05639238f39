// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! dispatch-adapters: the four abstract collaborators genuinely external to
//! the control plane (§1, §6.2–§6.5) — trait definitions plus in-memory
//! fakes under `test-support` for scenario tests.

pub mod blob_store;
pub mod container_runtime;
pub mod event_source;
pub mod secret_source;
pub mod traced;

pub use blob_store::{BlobStore, BlobStoreError};
pub use container_runtime::{
    ContainerRuntime, LaunchSpec, MountSpec, RuntimeAdapterError, RuntimeDescription, RuntimeState,
};
pub use event_source::{EventSink, EventSource, EventSourceError, StopCode, TerminationEvent};
pub use secret_source::{SecretBytes, SecretSource, SecretSourceError};
pub use traced::TracedContainerRuntime;

#[cfg(any(test, feature = "test-support"))]
pub use blob_store::InMemoryBlobStore;
#[cfg(any(test, feature = "test-support"))]
pub use container_runtime::{FakeContainerRuntime, RuntimeCall};
#[cfg(any(test, feature = "test-support"))]
pub use event_source::FakeEventSource;
#[cfg(any(test, feature = "test-support"))]
pub use secret_source::FakeSecretSource;
