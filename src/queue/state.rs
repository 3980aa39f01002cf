//! Queue snapshot on disk and scratch-directory hygiene

use crate::db::{read_json, write_json_atomic, QueueRecord};
use crate::error::Result;
use crate::mods::QueuedMod;
use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Load queued mods from a snapshot, dropping entries whose scratch
/// directory has disappeared.
pub fn load_snapshot(path: &Path) -> Vec<QueuedMod> {
    let entries = read_json::<QueueRecord>(path)
        .map(|record| record.queued_mods)
        .unwrap_or_default();

    entries
        .into_iter()
        .filter(|m| {
            let present = m.scratch_dir.is_dir();
            if !present {
                tracing::warn!(
                    "Dropping queued mod '{}' for {}: scratch directory is gone",
                    m.mod_id,
                    m.game_id
                );
            }
            present
        })
        .collect()
}

pub fn save_snapshot(path: &Path, entries: &[QueuedMod]) -> Result<()> {
    let record = QueueRecord {
        queued_mods: entries.to_vec(),
    };
    write_json_atomic(path, &record)
}

/// Delete everything under `scratch_root` that no queued mod owns.
///
/// Ownership is matched by entry name, as scratch directories are uniquely
/// named children of the scratch root. Returns the removed paths.
pub fn sweep_orphans(scratch_root: &Path, entries: &[QueuedMod]) -> Vec<PathBuf> {
    let owned: HashSet<&OsStr> = entries
        .iter()
        .filter_map(|m| m.scratch_dir.file_name())
        .collect();
    let mut removed = Vec::new();

    let read_dir = match std::fs::read_dir(scratch_root) {
        Ok(read_dir) => read_dir,
        Err(_) => return removed,
    };

    for entry in read_dir.filter_map(|e| e.ok()) {
        if owned.contains(entry.file_name().as_os_str()) {
            continue;
        }
        let path = entry.path();
        let result = match entry.file_type() {
            Ok(ft) if ft.is_dir() => std::fs::remove_dir_all(&path),
            Ok(_) => std::fs::remove_file(&path),
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                tracing::info!("Removed orphaned scratch entry {}", path.display());
                removed.push(path);
            }
            Err(e) => tracing::warn!("Failed to remove orphan {}: {}", path.display(), e),
        }
    }

    removed
}
