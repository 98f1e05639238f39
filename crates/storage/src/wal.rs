// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only JSONL write-ahead log for [`Event`] (§4.2, §9: "every state
//! transition is first durably logged, then applied to in-memory state").
//!
//! Each line is one record: `{"seq":N,"event":{...}}\n`. `Storage` fsyncs
//! after every single `append` (see `store.rs`), so unlike a log built for
//! a high-throughput batch workload this one carries no write-buffering or
//! group-commit path — there is never more than one unflushed entry to
//! amortize a flush over.

use crate::backup::rotate_to_backup;
use crate::StorageError;
use dispatch_core::{DispatchId, Event};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Serialize)]
struct WalRecordRef<'a> {
    seq: u64,
    event: &'a Event,
}

#[derive(Deserialize)]
struct WalRecord {
    seq: u64,
    event: Event,
}

/// A single WAL entry with its assigned sequence number.
#[derive(Debug, Clone)]
pub struct WalEntry {
    pub seq: u64,
    pub event: Event,
}

impl WalEntry {
    /// The dispatch this entry concerns, for entries that name one; pool
    /// and idempotency-claim events return `None`.
    pub fn dispatch_id(&self) -> Option<&DispatchId> {
        match &self.event {
            Event::DispatchCreated { dispatch } => Some(&dispatch.dispatch_id),
            Event::DispatchStatusChanged { dispatch_id, .. } => Some(dispatch_id),
            Event::DispatchArtifactSet { dispatch_id, .. } => Some(dispatch_id),
            Event::IdempotencyClaimed { .. } | Event::PoolSlotCreated { .. } => None,
            Event::PoolSlotStateChanged { .. } | Event::PoolSlotRemoved { .. } => None,
        }
    }

    fn kind(&self) -> &'static str {
        match &self.event {
            Event::DispatchCreated { .. } => "DispatchCreated",
            Event::DispatchStatusChanged { .. } => "DispatchStatusChanged",
            Event::DispatchArtifactSet { .. } => "DispatchArtifactSet",
            Event::IdempotencyClaimed { .. } => "IdempotencyClaimed",
            Event::PoolSlotCreated { .. } => "PoolSlotCreated",
            Event::PoolSlotStateChanged { .. } => "PoolSlotStateChanged",
            Event::PoolSlotRemoved { .. } => "PoolSlotRemoved",
        }
    }
}

/// Tally entries by event kind, for the recovery log line below — a plain
/// count tells an operator nothing about what was actually salvaged.
fn kind_counts(entries: &[WalEntry]) -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::new();
    for entry in entries {
        *counts.entry(entry.kind()).or_insert(0) += 1;
    }
    counts
}

/// JSONL WAL. Tracks the write sequence (highest seq assigned) and the
/// processed sequence (highest seq the engine has applied to
/// [`crate::MaterializedState`]); `entries_after` replays the gap between
/// the two on startup.
pub struct Wal {
    file: File,
    path: PathBuf,
    write_seq: u64,
    processed_seq: u64,
}

impl Wal {
    /// Open or create a WAL at `path`. `processed_seq` should come from the
    /// last snapshot (or 0 if none). A corrupt tail is rotated to `.bak`
    /// and the WAL reopened with only its valid prefix.
    pub fn open(path: &Path, processed_seq: u64) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = open_append(path)?;
        match read_entries(&file) {
            Ok(entries) => {
                let write_seq = entries.last().map(|e| e.seq).unwrap_or(0);
                Ok(Self {
                    file,
                    path: path.to_owned(),
                    write_seq,
                    processed_seq,
                })
            }
            Err(ReadError::Corrupt { valid_prefix }) => {
                warn!(
                    path = %path.display(),
                    valid_entries = valid_prefix.len(),
                    kinds = ?kind_counts(&valid_prefix),
                    "corrupt WAL tail, rotating to .bak and keeping the valid prefix",
                );
                drop(file);
                rotate_to_backup(path)?;
                rewrite(path, &valid_prefix)?;
                file = open_append(path)?;
                let write_seq = valid_prefix.last().map(|e| e.seq).unwrap_or(0);
                Ok(Self {
                    file,
                    path: path.to_owned(),
                    write_seq,
                    processed_seq,
                })
            }
            Err(ReadError::Io(e)) => Err(e.into()),
        }
    }

    /// Append `event`, returning its assigned sequence number. Not durable
    /// until [`Self::flush`].
    pub fn append(&mut self, event: &Event) -> Result<u64, StorageError> {
        self.write_seq += 1;
        let seq = self.write_seq;
        let mut bytes = serde_json::to_vec(&WalRecordRef { seq, event })?;
        bytes.push(b'\n');
        self.file.write_all(&bytes)?;
        Ok(seq)
    }

    pub fn flush(&mut self) -> Result<(), StorageError> {
        self.file.sync_all()?;
        Ok(())
    }

    pub fn mark_processed(&mut self, seq: u64) {
        self.processed_seq = seq;
    }

    pub fn processed_seq(&self) -> u64 {
        self.processed_seq
    }

    /// Drop entries before `seq`, reclaiming disk space after a checkpoint.
    pub fn truncate_before(&mut self, seq: u64) -> Result<(), StorageError> {
        self.flush()?;
        let kept: Vec<WalEntry> = match read_entries(&self.file) {
            Ok(entries) => entries,
            Err(ReadError::Corrupt { valid_prefix }) => valid_prefix,
            Err(ReadError::Io(e)) => return Err(e.into()),
        }
        .into_iter()
        .filter(|e| e.seq >= seq)
        .collect();

        rewrite(&self.path, &kept)?;
        self.file = open_append(&self.path)?;
        Ok(())
    }

    /// All entries after `seq`, for startup replay.
    pub fn entries_after(&self, seq: u64) -> Result<Vec<WalEntry>, StorageError> {
        let entries = match read_entries(&self.file) {
            Ok(entries) => entries,
            Err(ReadError::Corrupt { valid_prefix }) => valid_prefix,
            Err(ReadError::Io(e)) => return Err(e.into()),
        };
        Ok(entries.into_iter().filter(|e| e.seq > seq).collect())
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).read(true).append(true).open(path)
}

enum ReadError {
    /// A line failed to parse; `valid_prefix` holds everything read before it.
    Corrupt { valid_prefix: Vec<WalEntry> },
    Io(io::Error),
}

impl From<io::Error> for ReadError {
    fn from(e: io::Error) -> Self {
        ReadError::Io(e)
    }
}

/// Read and parse every line, stopping early if one fails to parse as
/// JSON — a half-written final line from a crash mid-`write_all` is the
/// only corruption this format can produce, and it can only ever be last.
fn read_entries(file: &File) -> Result<Vec<WalEntry>, ReadError> {
    let mut reader = BufReader::new(file.try_clone()?);
    reader.seek(SeekFrom::Start(0))?;

    let mut entries = Vec::new();
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                return Err(ReadError::Corrupt { valid_prefix: entries });
            }
            Err(e) => return Err(e.into()),
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<WalRecord>(trimmed) {
            Ok(record) => entries.push(WalEntry { seq: record.seq, event: record.event }),
            Err(_) => return Err(ReadError::Corrupt { valid_prefix: entries }),
        }
    }
    Ok(entries)
}

fn rewrite(path: &Path, entries: &[WalEntry]) -> Result<(), StorageError> {
    let tmp_path = path.with_extension("tmp");
    {
        let mut tmp_file = File::create(&tmp_path)?;
        for entry in entries {
            let mut bytes = serde_json::to_vec(&WalRecordRef { seq: entry.seq, event: &entry.event })?;
            bytes.push(b'\n');
            tmp_file.write_all(&bytes)?;
        }
        tmp_file.sync_all()?;
    }
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
