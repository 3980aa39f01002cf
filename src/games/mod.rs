//! Game profiles and launching

mod launch;

pub use launch::{resolve_executable, DetachedSpawner, LaunchMode, ProcessSpawner};

#[cfg(test)]
pub use launch::MockProcessSpawner;

use crate::error::{ModError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Per-game configuration fixing storage roots and the launch executable.
///
/// Immutable after load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameProfile {
    /// Short identifier (e.g., "stalker")
    pub id: String,

    /// Display name, defaults to the id
    #[serde(default)]
    pub name: Option<String>,

    /// Game installation path
    pub base_game_path: PathBuf,

    /// Mods folder, relative to the installation path
    #[serde(default = "default_mods_folder")]
    pub mods_folder: String,

    /// Game executable
    #[serde(default)]
    pub game_exe: Option<PathBuf>,
}

fn default_mods_folder() -> String {
    "mods".to_string()
}

impl GameProfile {
    pub fn new(id: impl Into<String>, base_game_path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            name: None,
            base_game_path: base_game_path.into(),
            mods_folder: default_mods_folder(),
            game_exe: None,
        }
    }

    pub fn with_exe(mut self, exe: impl Into<PathBuf>) -> Self {
        self.game_exe = Some(exe.into());
        self
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// Lookup of game profiles by id with a default fallback.
#[derive(Debug, Clone, Default)]
pub struct GameRegistry {
    profiles: Vec<GameProfile>,
    default_game: Option<String>,
}

impl GameRegistry {
    pub fn new(profiles: Vec<GameProfile>, default_game: Option<String>) -> Self {
        Self {
            profiles,
            default_game,
        }
    }

    pub fn all(&self) -> &[GameProfile] {
        &self.profiles
    }

    pub fn get(&self, id: &str) -> Option<&GameProfile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    /// Resolve a profile. `None` picks the configured default, else the first
    /// profile; an explicit id must exist.
    pub fn resolve(&self, id: Option<&str>) -> Result<&GameProfile> {
        match id {
            Some(id) => self
                .get(id)
                .ok_or_else(|| ModError::UnknownGame(id.to_string())),
            None => self
                .default_game
                .as_deref()
                .and_then(|id| self.get(id))
                .or_else(|| self.profiles.first())
                .ok_or_else(|| ModError::UnknownGame("<default>".to_string())),
        }
    }
}
