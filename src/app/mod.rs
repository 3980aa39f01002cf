//! Application wiring for the command line

mod actions;

use crate::config::Config;
use crate::games::GameProfile;
use crate::mods::ModManager;

use anyhow::{Context, Result};
use std::sync::Arc;

/// Main application struct that orchestrates all components
pub struct App {
    /// Application configuration
    pub config: Config,

    /// Mod manager
    pub mods: Arc<ModManager>,

    /// Game named with `--game`; the configured default applies otherwise
    selected_game: Option<String>,
}

impl App {
    /// Create a new App instance
    pub async fn new(config: Config, selected_game: Option<String>) -> Result<Self> {
        config.ensure_dirs().context("Failed to create directories")?;

        let mods = Arc::new(ModManager::from_config(&config));

        let app = Self {
            config,
            mods,
            selected_game,
        };
        if let Some(id) = app.selected_game.as_deref() {
            app.mods
                .games()
                .resolve(Some(id))
                .context("Run 'modstage game list' to see configured games")?;
        }
        Ok(app)
    }

    /// The game commands operate on
    pub fn active_game(&self) -> Result<&GameProfile> {
        self.mods
            .games()
            .resolve(self.selected_game.as_deref())
            .context("No game configured. Add a [[games]] entry to the config file.")
    }
}
