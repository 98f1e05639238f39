// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! dispatch-storage: the WAL-backed event store and the narrow repository
//! traits (§4.2, §4.3, §4.4, §9) the engine and daemon crates depend on.

mod backup;
mod error;
mod idempotency_store;
mod pool_repository;
mod repository;
mod snapshot;
mod state;
mod store;
mod wal;

pub use error::StorageError;
pub use idempotency_store::IdempotencyStore;
pub use pool_repository::PoolRepository;
pub use repository::{DispatchPage, DispatchRepository, StatusPatch};
pub use snapshot::Snapshot;
pub use state::MaterializedState;
pub use store::Storage;
pub use wal::{Wal, WalEntry};
