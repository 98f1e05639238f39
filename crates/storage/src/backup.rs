// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared `.bak`/`.bak.N` rotation for the two files that can be found
//! corrupt on open, [`crate::wal::Wal`] and [`crate::snapshot::Snapshot`]:
//! move the bad file aside instead of deleting it, keeping the last
//! [`MAX_GENERATIONS`] generations so a postmortem has something to read.

use std::fs;
use std::path::Path;

const MAX_GENERATIONS: u32 = 3;

/// Rename `path` to `path.bak`, shifting any existing `.bak`/`.bak.N` files
/// up one generation first and dropping the oldest.
pub(crate) fn rotate_to_backup(path: &Path) -> std::io::Result<()> {
    let bak = |n: u32| {
        if n == 1 {
            path.with_extension("bak")
        } else {
            path.with_extension(format!("bak.{n}"))
        }
    };

    let oldest = bak(MAX_GENERATIONS);
    if oldest.exists() {
        fs::remove_file(&oldest)?;
    }
    for n in (1..MAX_GENERATIONS).rev() {
        let src = bak(n);
        if src.exists() {
            fs::rename(&src, bak(n + 1))?;
        }
    }
    fs::rename(path, bak(1))
}
