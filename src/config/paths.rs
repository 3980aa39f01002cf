//! XDG-compliant path management

use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Manages all application paths using XDG base directories
#[derive(Debug, Clone)]
pub struct Paths {
    config_dir: PathBuf,
    data_dir: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

impl Paths {
    /// Create a new Paths instance from the XDG project directories.
    ///
    /// Falls back to `./.modstage` when no home directory can be determined.
    pub fn new() -> Self {
        match ProjectDirs::from("", "", "modstage") {
            Some(dirs) => Self {
                config_dir: dirs.config_dir().to_path_buf(),
                data_dir: dirs.data_dir().to_path_buf(),
            },
            None => Self::rooted(Path::new(".modstage")),
        }
    }

    /// Keep config and data under one root (used by `--data-dir` and tests).
    pub fn rooted(root: &Path) -> Self {
        Self {
            config_dir: root.to_path_buf(),
            data_dir: root.to_path_buf(),
        }
    }

    /// Replace only the data root, keeping the config location.
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    // ========== Config Paths ==========

    /// Config directory: ~/.config/modstage/
    pub fn config_dir(&self) -> PathBuf {
        self.config_dir.clone()
    }

    /// Main config file: ~/.config/modstage/config.toml
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    // ========== Data Paths ==========

    /// Data directory: ~/.local/share/modstage/
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone()
    }

    /// Installed-mod record: ~/.local/share/modstage/mods.json
    pub fn installed_file(&self) -> PathBuf {
        self.data_dir.join("mods.json")
    }

    /// Queue snapshot: ~/.local/share/modstage/queue.json
    pub fn queue_file(&self) -> PathBuf {
        self.data_dir.join("queue.json")
    }

    /// Scratch root for extraction workspaces: ~/.local/share/modstage/temp/
    pub fn scratch_dir(&self) -> PathBuf {
        self.data_dir.join("temp")
    }

    /// Log directory: ~/.local/share/modstage/logs/
    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    // ========== Utility Methods ==========

    /// Ensure all required directories exist
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.config_dir())?;
        std::fs::create_dir_all(self.data_dir())?;
        std::fs::create_dir_all(self.scratch_dir())?;
        Ok(())
    }
}
