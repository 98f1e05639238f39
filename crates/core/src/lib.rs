// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! dispatch-core: domain types, state machine, and validation for the
//! multi-tenant dispatch control plane.

pub mod agent;
pub mod clock;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod id;
pub mod idempotency;
pub mod pool;
pub mod request;

pub use agent::{Agent, ModelRegistry, ModelTier, UnknownAgent, UnknownModel};
pub use clock::{Clock, FakeClock, SystemClock};
pub use dispatch::{
    Constraints, ContextLevel, Dispatch, DispatchId, DispatchStatus, TenantId, TransitionError,
    WorkspaceMode, DISPATCH_TTL_MS, IDEMPOTENCY_TTL_MS,
};
pub use error::DispatchError;
pub use event::Event;
pub use id::{IdGen, SequentialIdGen, ShortId, SortableIdGen, SystemSortableIdGen, UuidIdGen};
pub use idempotency::IdempotencyRecord;
pub use pool::{PoolSlot, SlotId, SlotState};
pub use request::{
    DispatchRequest, FieldError, ValidatedDispatchRequest, ValidationErrors, MAX_TASK_CHARS,
    MAX_TIMEOUT_SECONDS, MIN_TASK_CHARS, MIN_TIMEOUT_SECONDS,
};
