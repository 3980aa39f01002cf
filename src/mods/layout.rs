//! Canonical directories for a game's content files
//!
//! Every game gets its own subdirectory (named after the game id) under each
//! root, so two games sharing one install root never share an active folder.

use crate::config::Config;
use crate::error::{ModError, Result};
use crate::games::GameProfile;
use crate::mods::ModStatus;
use std::path::{Path, PathBuf};

/// Resolves where a mod's files must live for a given game and state.
#[derive(Debug, Clone)]
pub struct ModLayout {
    data_root: PathBuf,
    disabled_root: PathBuf,
    misc_root: PathBuf,
}

impl ModLayout {
    pub fn new(
        data_root: impl Into<PathBuf>,
        disabled_root: impl Into<PathBuf>,
        misc_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            data_root: data_root.into(),
            disabled_root: disabled_root.into(),
            misc_root: misc_root.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.paths.data_dir(),
            config.disabled_root(),
            config.misc_root(),
        )
    }

    /// `<base>/<mods_folder>/<game>`: where the game loads content from.
    pub fn active_path(&self, game: &GameProfile) -> PathBuf {
        game.base_game_path.join(&game.mods_folder).join(&game.id)
    }

    /// `<data>/<disabled>/<game>`: holding area excluded from load.
    pub fn disabled_path(&self, game: &GameProfile) -> PathBuf {
        self.disabled_root.join(&game.id)
    }

    /// `<data>/<misc>/<game>`: preview image storage.
    pub fn misc_path(&self, game: &GameProfile) -> PathBuf {
        self.misc_root.join(&game.id)
    }

    /// Directory a content file must reside in for `status`.
    pub fn status_path(&self, game: &GameProfile, status: ModStatus) -> PathBuf {
        match status {
            ModStatus::Enabled => self.active_path(game),
            ModStatus::Disabled => self.disabled_path(game),
        }
    }

    pub fn resolve_active_path(&self, game: &GameProfile) -> Result<PathBuf> {
        ensure_dir(self.active_path(game))
    }

    pub fn resolve_disabled_path(&self, game: &GameProfile) -> Result<PathBuf> {
        ensure_dir(self.disabled_path(game))
    }

    pub fn resolve_misc_path(&self, game: &GameProfile) -> Result<PathBuf> {
        ensure_dir(self.misc_path(game))
    }

    pub fn resolve_status_path(&self, game: &GameProfile, status: ModStatus) -> Result<PathBuf> {
        ensure_dir(self.status_path(game, status))
    }

    /// Absolute path of a data-relative reference
    pub fn absolute_ref(&self, reference: &str) -> PathBuf {
        self.data_root.join(reference)
    }

    /// Reference to a file relative to the data root, with `/` separators.
    pub fn relative_ref(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.data_root).unwrap_or(path);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

fn ensure_dir(dir: PathBuf) -> Result<PathBuf> {
    std::fs::create_dir_all(&dir)
        .map_err(|e| ModError::io("Failed to create directory", &dir, e))?;
    tracing::debug!("Resolved {}", dir.display());
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(root: &Path) -> ModLayout {
        ModLayout::new(root, root.join("disabled"), root.join("misc"))
    }

    #[test]
    fn games_sharing_an_install_root_get_distinct_active_dirs() {
        let root = Path::new("/games/shared");
        let a = GameProfile::new("alpha", root);
        let b = GameProfile::new("bravo", root);
        let layout = layout(Path::new("/data"));

        assert_ne!(layout.active_path(&a), layout.active_path(&b));
        assert_eq!(
            layout.active_path(&a),
            PathBuf::from("/games/shared/mods/alpha")
        );
    }

    #[test]
    fn status_path_matches_status() {
        let game = GameProfile::new("alpha", "/games/alpha");
        let layout = layout(Path::new("/data"));

        assert_eq!(
            layout.status_path(&game, ModStatus::Enabled),
            layout.active_path(&game)
        );
        assert_eq!(
            layout.status_path(&game, ModStatus::Disabled),
            PathBuf::from("/data/disabled/alpha")
        );
    }

    #[test]
    fn resolving_creates_directories_idempotently() {
        let dir = tempfile::tempdir().unwrap();
        let game = GameProfile::new("alpha", dir.path().join("game"));
        let layout = layout(dir.path());

        let first = layout.resolve_misc_path(&game).unwrap();
        let second = layout.resolve_misc_path(&game).unwrap();
        assert_eq!(first, second);
        assert!(first.is_dir());
        assert!(layout.resolve_active_path(&game).unwrap().is_dir());
        assert!(layout.resolve_disabled_path(&game).unwrap().is_dir());
    }

    #[test]
    fn relative_ref_is_rooted_at_data_dir() {
        let layout = layout(Path::new("/data"));
        assert_eq!(
            layout.relative_ref(Path::new("/data/misc/alpha/cover.jpg")),
            "misc/alpha/cover.jpg"
        );
    }
}
