//! Launching the game executable

use super::GameProfile;
use crate::error::{ModError, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// How the game should be started
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LaunchMode {
    /// Start with whatever mods are currently enabled
    #[default]
    Modded,
    /// Disable every enabled mod first
    Vanilla,
}

impl LaunchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LaunchMode::Modded => "modded",
            LaunchMode::Vanilla => "vanilla",
        }
    }

    pub fn from_cli(value: &str) -> anyhow::Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "modded" => Ok(LaunchMode::Modded),
            "vanilla" => Ok(LaunchMode::Vanilla),
            other => anyhow::bail!("Unknown launch mode '{}'. Valid: modded, vanilla", other),
        }
    }
}

/// Starts an external process without waiting on it.
#[cfg_attr(test, mockall::automock)]
pub trait ProcessSpawner: Send + Sync {
    fn spawn_detached(&self, exe: &Path) -> std::io::Result<()>;
}

/// Spawns the executable detached from our stdio; the child is never awaited.
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedSpawner;

impl ProcessSpawner for DetachedSpawner {
    fn spawn_detached(&self, exe: &Path) -> std::io::Result<()> {
        let mut command = Command::new(exe);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(parent) = exe.parent().filter(|p| !p.as_os_str().is_empty()) {
            command.current_dir(parent);
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let child = command.spawn()?;
        tracing::info!("Spawned {} (pid {})", exe.display(), child.id());
        Ok(())
    }
}

/// Resolve the profile's executable to an existing file, searching `PATH`
/// for bare command names.
pub fn resolve_executable(profile: &GameProfile) -> Result<PathBuf> {
    let missing = || ModError::MissingExecutable {
        game_id: profile.id.clone(),
    };
    let exe = profile.game_exe.as_ref().ok_or_else(missing)?;

    if exe.is_file() {
        return Ok(exe.clone());
    }
    which::which(exe).map_err(|e| {
        tracing::debug!("Executable {} not resolvable: {}", exe.display(), e);
        missing()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launch_mode_parses_cli_values() {
        assert_eq!(LaunchMode::from_cli("Vanilla").unwrap(), LaunchMode::Vanilla);
        assert_eq!(LaunchMode::from_cli("modded").unwrap(), LaunchMode::Modded);
        assert!(LaunchMode::from_cli("safe").is_err());
    }

    #[test]
    fn unconfigured_executable_is_missing() {
        let profile = GameProfile::new("alpha", "/games/alpha");
        assert!(matches!(
            resolve_executable(&profile),
            Err(ModError::MissingExecutable { .. })
        ));
    }

    #[test]
    fn nonexistent_executable_is_missing() {
        let profile =
            GameProfile::new("alpha", "/games/alpha").with_exe("/definitely/not/here/game.exe");
        assert!(matches!(
            resolve_executable(&profile),
            Err(ModError::MissingExecutable { .. })
        ));
    }

    #[test]
    fn existing_executable_resolves_to_itself() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("game.exe");
        std::fs::write(&exe, b"").unwrap();

        let profile = GameProfile::new("alpha", dir.path()).with_exe(&exe);
        assert_eq!(resolve_executable(&profile).unwrap(), exe);
    }
}
