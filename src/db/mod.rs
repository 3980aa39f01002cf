//! Durable records for installed mods and the queue snapshot
//!
//! Writes go to a temp file beside the target, are synced, then renamed over
//! the target so a crash leaves either the old or the new record.

mod schema;

pub use schema::*;

use crate::error::{ModError, Result};
use crate::mods::InstalledMod;
use serde::{de::DeserializeOwned, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Backing record for the installed-mod collection.
#[cfg_attr(test, mockall::automock)]
pub trait ModRecordStore: Send + Sync {
    /// Read the full collection. Missing or unreadable records yield an
    /// empty collection.
    fn load(&self) -> Vec<InstalledMod>;

    /// Replace the full collection.
    fn save(&self, mods: &[InstalledMod]) -> Result<()>;

    /// Where the record lives, for diagnostics
    fn location(&self) -> PathBuf;
}

/// `mods.json` on disk
#[derive(Debug, Clone)]
pub struct JsonRecordFile {
    path: PathBuf,
}

impl JsonRecordFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ModRecordStore for JsonRecordFile {
    fn load(&self) -> Vec<InstalledMod> {
        read_json::<InstalledRecord>(&self.path)
            .map(|record| record.installed_mods)
            .unwrap_or_default()
    }

    fn save(&self, mods: &[InstalledMod]) -> Result<()> {
        let record = InstalledRecord {
            installed_mods: mods.to_vec(),
        };
        write_json_atomic(&self.path, &record)
    }

    fn location(&self) -> PathBuf {
        self.path.clone()
    }
}

/// Read and parse a JSON record. `None` when missing or unparsable.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!("Failed to read {}: {}", path.display(), e);
            return None;
        }
    };

    match serde_json::from_str(&content) {
        Ok(data) => Some(data),
        Err(e) => {
            tracing::warn!("Ignoring unparsable {}: {}", path.display(), e);
            None
        }
    }
}

/// Serialize `data` and atomically replace `path` with it.
pub fn write_json_atomic<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    let persistence = |message: String| ModError::Persistence {
        path: path.to_path_buf(),
        message,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| persistence(format!("failed to create {}: {}", parent.display(), e)))?;
    }

    let serialized = serde_json::to_string_pretty(data)
        .map_err(|e| persistence(format!("failed to serialize: {}", e)))?;

    let temp_path = path.with_extension(format!("json.{}.tmp", std::process::id()));
    let written = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .and_then(|mut file| {
            file.write_all(serialized.as_bytes())?;
            file.sync_all()
        });
    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(persistence(format!("failed to write temp file: {}", e)));
    }

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        persistence(format!("failed to replace record: {}", e))
    })?;

    tracing::debug!("Persisted {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mods::ModStatus;
    use chrono::Utc;

    fn sample(game_id: &str, mod_id: &str) -> InstalledMod {
        InstalledMod {
            mod_id: mod_id.into(),
            game_id: game_id.into(),
            title: format!("Mod {}", mod_id),
            weight: 1,
            path: PathBuf::from(format!("/games/{}/mods/{}.gro", game_id, mod_id)),
            status: ModStatus::Enabled,
            installed_at: Utc::now(),
            preview_ref: String::new(),
        }
    }

    #[test]
    fn saved_collection_reads_back_equal() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRecordFile::new(dir.path().join("mods.json"));
        let mods = vec![sample("alpha", "1"), sample("bravo", "1")];

        store.save(&mods).unwrap();
        assert_eq!(store.load(), mods);
    }

    #[test]
    fn missing_record_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRecordFile::new(dir.path().join("mods.json"));
        assert!(store.load().is_empty());
    }

    #[test]
    fn unparsable_record_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mods.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(JsonRecordFile::new(path).load().is_empty());
    }

    #[test]
    fn save_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRecordFile::new(dir.path().join("mods.json"));
        store.save(&[sample("alpha", "1")]).unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["mods.json".to_string()]);
    }

    #[test]
    fn unwritable_location_is_a_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, b"").unwrap();
        let store = JsonRecordFile::new(blocker.join("mods.json"));

        let err = store.save(&[]).unwrap_err();
        assert!(err.is_persistence());
    }
}
