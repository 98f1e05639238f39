// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! zstd-compressed point-in-time snapshots of [`MaterializedState`], so
//! startup replays only the WAL tail instead of the whole history.

use crate::backup::rotate_to_backup;
use crate::{MaterializedState, StorageError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::warn;

/// A snapshot of [`MaterializedState`] at a given WAL sequence number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub seq: u64,
    pub state: MaterializedState,
    pub created_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(seq: u64, state: MaterializedState) -> Self {
        Self {
            seq,
            state,
            created_at: Utc::now(),
        }
    }

    /// Serialize, zstd-compress, and atomically write to `path` (tmp file +
    /// fsync + rename + directory fsync, so a crash never observes a
    /// half-written snapshot).
    pub fn save(&self, path: &Path, compression_level: i32) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = path.with_extension("tmp");
        let json_bytes = serde_json::to_vec(self)?;
        let compressed = zstd::encode_all(json_bytes.as_slice(), compression_level)
            .map_err(|e| StorageError::Compress(e.to_string()))?;

        {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            writer.write_all(&compressed)?;
            writer
                .into_inner()
                .map_err(|e| StorageError::Io(e.into_error()))?
                .sync_all()?;
        }

        fs::rename(&tmp_path, path)?;
        if let Some(parent) = path.parent() {
            File::open(parent)?.sync_all()?;
        }
        Ok(())
    }

    /// Load a snapshot, if present. A corrupt snapshot is rotated to `.bak`
    /// and treated as absent so the caller falls back to a full WAL replay.
    pub fn load(path: &Path) -> Result<Option<Self>, StorageError> {
        if !path.exists() {
            return Ok(None);
        }

        let file = File::open(path)?;
        let decoder = match zstd::stream::read::Decoder::new(file) {
            Ok(d) => d,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corrupt snapshot, starting fresh");
                rotate_corrupt(path)?;
                return Ok(None);
            }
        };
        let reader = BufReader::new(decoder);
        match serde_json::from_reader(reader) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corrupt snapshot, starting fresh");
                rotate_corrupt(path)?;
                Ok(None)
            }
        }
    }
}

fn rotate_corrupt(path: &Path) -> Result<(), StorageError> {
    rotate_to_backup(path)?;
    Ok(())
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
