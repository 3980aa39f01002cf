//! Mod lifecycle: extraction, staging, installation and toggling

mod archive;
mod audit;
mod install;
mod layout;
mod manager;

pub use archive::*;
pub use audit::*;
pub use install::*;
pub use layout::*;
pub use manager::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Composite key scoping a mod identifier to its game.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModKey {
    pub game_id: String,
    pub mod_id: String,
}

impl ModKey {
    pub fn new(game_id: impl Into<String>, mod_id: impl Into<String>) -> Self {
        Self {
            game_id: game_id.into(),
            mod_id: mod_id.into(),
        }
    }
}

impl fmt::Display for ModKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.game_id, self.mod_id)
    }
}

/// Whether an installed mod's content file is where the game loads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModStatus {
    Enabled,
    Disabled,
}

impl ModStatus {
    pub fn toggled(self) -> Self {
        match self {
            ModStatus::Enabled => ModStatus::Disabled,
            ModStatus::Disabled => ModStatus::Enabled,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModStatus::Enabled => "enabled",
            ModStatus::Disabled => "disabled",
        }
    }
}

impl fmt::Display for ModStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mod waiting in the queue. Owns its scratch directory until consumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedMod {
    pub mod_id: String,
    pub game_id: String,
    pub title: String,
    /// Content file, relative to the scratch directory
    pub content_file: PathBuf,
    /// Content file size in bytes at extraction time
    pub weight: u64,
    pub preview_file: PathBuf,
    pub metadata_file: PathBuf,
    pub scratch_dir: PathBuf,
    /// Preview reference relative to the data dir
    pub preview_ref: String,
    pub queued_at: DateTime<Utc>,
}

impl QueuedMod {
    pub fn key(&self) -> ModKey {
        ModKey::new(&self.game_id, &self.mod_id)
    }

    pub(crate) fn has_key(&self, key: &ModKey) -> bool {
        self.game_id == key.game_id && self.mod_id == key.mod_id
    }

    pub fn content_path(&self) -> PathBuf {
        self.scratch_dir.join(&self.content_file)
    }

    pub fn preview_path(&self) -> PathBuf {
        self.scratch_dir.join(&self.preview_file)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.scratch_dir.join(&self.metadata_file)
    }
}

/// A mod committed to a game. `path` always points into the directory that
/// matches `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstalledMod {
    pub mod_id: String,
    pub game_id: String,
    pub title: String,
    pub weight: u64,
    /// Current absolute location of the content file
    pub path: PathBuf,
    pub status: ModStatus,
    pub installed_at: DateTime<Utc>,
    pub preview_ref: String,
}

impl InstalledMod {
    pub fn key(&self) -> ModKey {
        ModKey::new(&self.game_id, &self.mod_id)
    }

    pub fn is_enabled(&self) -> bool {
        self.status == ModStatus::Enabled
    }

    pub(crate) fn has_key(&self, key: &ModKey) -> bool {
        self.game_id == key.game_id && self.mod_id == key.mod_id
    }
}

/// File name of `path`, or the whole path when it has none.
pub(crate) fn file_name_of(path: &Path) -> &Path {
    path.file_name().map(Path::new).unwrap_or(path)
}
