//! Install queue
//!
//! Holds extracted packages that are staged for installation, keyed by
//! (game, mod id). Each entry owns a scratch directory until it is either
//! committed or removed. The in-memory list is authoritative; a JSON
//! snapshot lets the queue survive a restart.

pub mod state;

use crate::error::{ModError, Result};
use crate::mods::{ModKey, QueuedMod};
use std::path::{Path, PathBuf};

/// Ordered set of queued mods
#[derive(Debug, Default)]
pub struct QueueStore {
    entries: Vec<QueuedMod>,
    snapshot: Option<PathBuf>,
}

impl QueueStore {
    /// A queue that is never written to disk
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Restore the queue from `snapshot` and remove scratch entries that no
    /// restored mod owns.
    pub fn open(snapshot: impl Into<PathBuf>, scratch_root: &Path) -> Self {
        let snapshot = snapshot.into();
        let entries = state::load_snapshot(&snapshot);
        let removed = state::sweep_orphans(scratch_root, &entries);
        tracing::info!(
            "Restored {} queued mod(s), swept {} orphan(s)",
            entries.len(),
            removed.len()
        );
        Self {
            entries,
            snapshot: Some(snapshot),
        }
    }

    /// Append a mod. Rejects a (game, id) pair that is already queued.
    pub fn enqueue(&mut self, queued: QueuedMod) -> Result<()> {
        if self.contains(&queued.key()) {
            return Err(ModError::DuplicateQueued {
                game_id: queued.game_id,
                mod_id: queued.mod_id,
            });
        }
        tracing::debug!("Queued {}", queued.key());
        self.entries.push(queued);
        self.save();
        Ok(())
    }

    /// Queued mods of one game in insertion order
    pub fn list(&self, game_id: &str) -> Vec<QueuedMod> {
        self.entries
            .iter()
            .filter(|m| m.game_id == game_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &ModKey) -> Option<&QueuedMod> {
        self.entries.iter().find(|m| m.has_key(key))
    }

    pub fn contains(&self, key: &ModKey) -> bool {
        self.get(key).is_some()
    }

    fn take(&mut self, key: &ModKey) -> Result<QueuedMod> {
        let index = self
            .entries
            .iter()
            .position(|m| m.has_key(key))
            .ok_or_else(|| ModError::NotFound {
                game_id: key.game_id.clone(),
                mod_id: key.mod_id.clone(),
            })?;
        let taken = self.entries.remove(index);
        self.save();
        Ok(taken)
    }

    /// Remove an entry and delete its scratch directory.
    pub fn dequeue(&mut self, key: &ModKey) -> Result<QueuedMod> {
        let removed = self.take(key)?;
        remove_scratch_dir(&removed.scratch_dir);
        tracing::info!("Removed {} from the queue", removed.key());
        Ok(removed)
    }

    fn save(&self) {
        let Some(path) = &self.snapshot else {
            return;
        };
        if let Err(e) = state::save_snapshot(path, &self.entries) {
            tracing::warn!("Queue snapshot not written: {}", e);
        }
    }
}

/// Best-effort recursive delete of a scratch directory.
pub(crate) fn remove_scratch_dir(dir: &Path) {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => tracing::debug!("Removed scratch {}", dir.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove scratch {}: {}", dir.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn queued(root: &Path, game_id: &str, mod_id: &str) -> QueuedMod {
        let scratch_dir = root.join(format!("{}-{}", game_id, mod_id));
        std::fs::create_dir_all(&scratch_dir).unwrap();
        std::fs::write(scratch_dir.join("map.gro"), b"content").unwrap();
        QueuedMod {
            mod_id: mod_id.to_string(),
            game_id: game_id.to_string(),
            title: format!("Mod {}", mod_id),
            content_file: PathBuf::from("map.gro"),
            weight: 7,
            preview_file: PathBuf::from("cover.jpg"),
            metadata_file: PathBuf::from("info.txt"),
            scratch_dir,
            preview_ref: String::new(),
            queued_at: Utc::now(),
        }
    }

    #[test]
    fn duplicate_pair_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut queue = QueueStore::in_memory();
        queue.enqueue(queued(dir.path(), "alpha", "1")).unwrap();

        let err = queue.enqueue(queued(dir.path(), "alpha", "1")).unwrap_err();
        assert!(matches!(err, ModError::DuplicateQueued { .. }));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn same_id_for_different_games_is_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let mut queue = QueueStore::in_memory();
        queue.enqueue(queued(dir.path(), "alpha", "1")).unwrap();
        queue.enqueue(queued(dir.path(), "bravo", "1")).unwrap();

        assert_eq!(queue.list("alpha").len(), 1);
        assert_eq!(queue.list("bravo").len(), 1);
    }

    #[test]
    fn list_keeps_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut queue = QueueStore::in_memory();
        for id in ["30", "10", "20"] {
            queue.enqueue(queued(dir.path(), "alpha", id)).unwrap();
        }

        let ids: Vec<_> = queue.list("alpha").into_iter().map(|m| m.mod_id).collect();
        assert_eq!(ids, vec!["30", "10", "20"]);
    }

    #[test]
    fn dequeue_deletes_scratch_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut queue = QueueStore::in_memory();
        let entry = queued(dir.path(), "alpha", "1");
        let scratch = entry.scratch_dir.clone();
        queue.enqueue(entry).unwrap();

        queue.dequeue(&ModKey::new("alpha", "1")).unwrap();
        assert!(!scratch.exists());
        assert!(queue.is_empty());
        assert!(matches!(
            queue.dequeue(&ModKey::new("alpha", "1")),
            Err(ModError::NotFound { .. })
        ));
    }

    #[test]
    fn reopened_queue_restores_entries_and_sweeps_orphans() {
        let dir = tempfile::tempdir().unwrap();
        let scratch_root = dir.path().join("temp");
        let snapshot = dir.path().join("queue.json");

        {
            let mut queue = QueueStore::open(&snapshot, &scratch_root);
            queue.enqueue(queued(&scratch_root, "alpha", "1")).unwrap();
        }
        std::fs::create_dir_all(scratch_root.join("leftover")).unwrap();

        let queue = QueueStore::open(&snapshot, &scratch_root);
        assert!(queue.contains(&ModKey::new("alpha", "1")));
        assert!(scratch_root.join("alpha-1").is_dir());
        assert!(!scratch_root.join("leftover").exists());
    }
}
