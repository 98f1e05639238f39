// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`EventSource`] (§6.3): delivers termination events via a push callback,
//! at-least-once and unordered.

use async_trait::async_trait;
use thiserror::Error;

/// Why the container stopped, as reported by the runtime (§4.7, §6.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCode {
    UserInitiated,
    TaskFailedToStart,
    Exited,
    Other,
}

/// A termination event as delivered by the event bus (§6.3).
#[derive(Debug, Clone)]
pub struct TerminationEvent {
    pub runtime_handle: String,
    pub stop_code: StopCode,
    pub stop_reason: String,
    pub exit_code: Option<i32>,
    pub stopped_at_ms: u64,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventSourceError {
    #[error("event source unavailable: {0}")]
    Unavailable(String),
}

/// A sink a subscriber hands to [`EventSource::subscribe`]; the event source
/// pushes into it as events arrive.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn deliver(&self, event: TerminationEvent);
}

#[async_trait]
pub trait EventSource: Send + Sync {
    async fn subscribe(&self, sink: std::sync::Arc<dyn EventSink>) -> Result<(), EventSourceError>;
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// In-memory [`EventSource`] whose `push` method drives delivery
    /// directly, for deterministic scenario tests.
    #[derive(Clone, Default)]
    pub struct FakeEventSource {
        sinks: Arc<Mutex<Vec<Arc<dyn EventSink>>>>,
    }

    impl FakeEventSource {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn push(&self, event: TerminationEvent) {
            let sinks = self.sinks.lock().clone();
            for sink in sinks {
                sink.deliver(event.clone()).await;
            }
        }
    }

    #[async_trait]
    impl EventSource for FakeEventSource {
        async fn subscribe(&self, sink: Arc<dyn EventSink>) -> Result<(), EventSourceError> {
            self.sinks.lock().push(sink);
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeEventSource;

#[cfg(test)]
#[path = "event_source_tests.rs"]
mod tests;
