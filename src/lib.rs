//! modstage - staging, installation and toggling of game content packages
//!
//! Packages move through a fixed lifecycle:
//! - uploaded archives are extracted into a scratch directory and queued
//! - processing the queue commits each package into the game's active folder
//! - installed packages are toggled between the active and a disabled folder
//! - a vanilla launch disables everything before starting the game
//!
//! Each game keeps its own namespace and directories.

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod games;
pub mod mods;
pub mod queue;

#[cfg(test)]
mod test_support;

pub use app::App;
pub use config::Config;
pub use error::{ModError, Result};
