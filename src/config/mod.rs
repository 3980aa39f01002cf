//! Configuration management for modstage
//!
//! Uses XDG-compliant paths:
//! - Config: ~/.config/modstage/config.toml
//! - Data: ~/.local/share/modstage/

mod paths;

pub use paths::Paths;

use crate::games::{GameProfile, GameRegistry};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Game used when a command does not name one
    pub default_game: Option<String>,

    /// Folder name (under the data dir) holding disabled content files
    pub disabled_folder: String,

    /// Folder name (under the data dir) holding preview images
    pub misc_folder: String,

    /// Override for the data root (state, scratch, disabled, misc)
    pub data_dir_override: Option<String>,

    /// Supported games
    pub games: Vec<GameProfile>,

    /// Paths configuration
    #[serde(skip)]
    pub paths: Paths,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_game: None,
            disabled_folder: "disabled".to_string(),
            misc_folder: "misc".to_string(),
            data_dir_override: None,
            games: Vec::new(),
            paths: Paths::new(),
        }
    }
}

impl Config {
    /// Root for disabled content files, one subdirectory per game
    pub fn disabled_root(&self) -> PathBuf {
        self.paths.data_dir().join(&self.disabled_folder)
    }

    /// Root for preview images, one subdirectory per game
    pub fn misc_root(&self) -> PathBuf {
        self.paths.data_dir().join(&self.misc_folder)
    }

    /// Game profiles with default-game fallback
    pub fn registry(&self) -> GameRegistry {
        GameRegistry::new(self.games.clone(), self.default_game.clone())
    }

    /// Point all state at a different data root.
    pub fn set_data_dir(&mut self, data_dir: impl Into<PathBuf>) {
        let data_dir = data_dir.into();
        self.data_dir_override = Some(data_dir.to_string_lossy().to_string());
        self.paths = self.paths.clone().with_data_dir(data_dir);
    }

    /// Ensure required directories exist
    pub fn ensure_dirs(&self) -> Result<()> {
        self.paths
            .ensure_dirs()
            .context("Failed to create application directories")?;
        std::fs::create_dir_all(self.disabled_root())
            .context("Failed to create disabled directory")?;
        std::fs::create_dir_all(self.misc_root()).context("Failed to create misc directory")?;
        Ok(())
    }

    /// Load configuration from disk or create default
    pub async fn load() -> Result<Self> {
        Self::load_with(Paths::new()).await
    }

    /// Load configuration from the config file of `paths`
    pub async fn load_with(paths: Paths) -> Result<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .await
                .context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")?
        } else {
            let mut config = Config::default();
            config.paths = paths.clone();
            config.save().await?;
            config
        };

        config.paths = match config.data_dir_override.as_deref() {
            Some(dir) if !dir.trim().is_empty() => {
                let data_dir = absolute_override(&paths, dir.trim())?;
                paths.with_data_dir(data_dir)
            }
            _ => paths,
        };
        Ok(config)
    }

    /// Save configuration to disk
    pub async fn save(&self) -> Result<()> {
        let config_path = self.paths.config_file();

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, content)
            .await
            .context("Failed to write config file")?;

        Ok(())
    }
}

/// A relative override is taken relative to the config directory, so every
/// invocation lands on the same stores regardless of working directory.
fn absolute_override(paths: &Paths, dir: &str) -> Result<PathBuf> {
    let resolved = paths.config_dir().join(dir);
    if resolved.is_absolute() {
        return Ok(resolved);
    }
    let cwd = std::env::current_dir().context("Failed to read working directory")?;
    Ok(cwd.join(resolved))
}
