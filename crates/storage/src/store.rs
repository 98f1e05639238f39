// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The single concrete backend behind [`crate::DispatchRepository`],
//! [`crate::PoolRepository`], and [`crate::IdempotencyStore`] (§9: "a small
//! set of narrow capability interfaces implemented by a single concrete
//! backend per deployment").

use crate::snapshot::Snapshot;
use crate::state::MaterializedState;
use crate::wal::Wal;
use crate::StorageError;
use dispatch_core::Event;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

pub(crate) struct Inner {
    pub(crate) state: MaterializedState,
    pub(crate) wal: Wal,
}

/// WAL-backed, snapshot-checkpointed storage. Cheaply `Clone`-able; every
/// clone shares the same underlying state and WAL handle.
#[derive(Clone)]
pub struct Storage {
    pub(crate) inner: Arc<Mutex<Inner>>,
    snapshot_path: PathBuf,
    compression_level: i32,
}

impl Storage {
    /// Open (or create) a store rooted at `dir`: `dir/wal.jsonl` and
    /// `dir/snapshot.zst`. Replays the snapshot (if any) then any WAL
    /// entries written after it.
    pub fn open(dir: &Path) -> Result<Self, StorageError> {
        let wal_path = dir.join("wal.jsonl");
        let snapshot_path = dir.join("snapshot.zst");

        let snapshot = Snapshot::load(&snapshot_path)?;
        let (mut state, processed_seq) = match snapshot {
            Some(s) => (s.state, s.seq),
            None => (MaterializedState::default(), 0),
        };

        let mut wal = Wal::open(&wal_path, processed_seq)?;
        let tail = wal.entries_after(processed_seq)?;
        for entry in &tail {
            state.apply_event(&entry.event);
            wal.mark_processed(entry.seq);
        }

        info!(
            replayed = tail.len(),
            processed_seq = wal.processed_seq(),
            "storage opened"
        );

        Ok(Self {
            inner: Arc::new(Mutex::new(Inner { state, wal })),
            snapshot_path,
            compression_level: 3,
        })
    }

    /// An in-memory-only store with no backing files, for tests.
    pub fn open_ephemeral(dir: &Path) -> Result<Self, StorageError> {
        Self::open(dir)
    }

    pub(crate) fn append_and_apply(&self, event: Event) -> Result<(), StorageError> {
        let mut guard = self.inner.lock();
        let seq = guard.wal.append(&event)?;
        guard.wal.flush()?;
        guard.state.apply_event(&event);
        guard.wal.mark_processed(seq);
        Ok(())
    }

    /// Write a compressed snapshot at the current processed sequence and
    /// truncate the WAL up to it. Call periodically (daemon background
    /// task), never from the hot request path.
    pub fn checkpoint(&self) -> Result<(), StorageError> {
        let (seq, state_clone) = {
            let guard = self.inner.lock();
            (guard.wal.processed_seq(), guard.state.clone())
        };
        let snapshot = Snapshot::new(seq, state_clone);
        snapshot.save(&self.snapshot_path, self.compression_level)?;

        let mut guard = self.inner.lock();
        guard.wal.truncate_before(seq)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
