//! Error types for the mod lifecycle.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Role a file plays inside a mod package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileRole {
    /// The game-content file the game actually loads
    Content,
    /// Preview image shown next to the mod
    Preview,
    /// Text file carrying the `#`-delimited title
    Metadata,
}

impl FileRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileRole::Content => "content",
            FileRole::Preview => "preview",
            FileRole::Metadata => "metadata",
        }
    }
}

impl fmt::Display for FileRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn join_roles(roles: &[FileRole]) -> String {
    roles
        .iter()
        .map(FileRole::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors surfaced by the queue, install store and orchestrator.
#[derive(Debug, Error)]
pub enum ModError {
    #[error("Malformed archive: missing {} file(s)", join_roles(.missing))]
    MalformedArchive { missing: Vec<FileRole> },

    #[error("Unsupported archive format: {name}")]
    UnsupportedArchive { name: String },

    #[error("Failed to read archive {name}: {message}")]
    Archive { name: String, message: String },

    #[error("Mod '{mod_id}' is already queued for {game_id}")]
    DuplicateQueued { game_id: String, mod_id: String },

    #[error("Mod '{mod_id}' not found for {game_id}")]
    NotFound { game_id: String, mod_id: String },

    #[error("Failed to move {} to {}: {source}", .from.display(), .to.display())]
    FileMove {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to persist {}: {message}", .path.display())]
    Persistence { path: PathBuf, message: String },

    #[error("No usable executable configured for {game_id}")]
    MissingExecutable { game_id: String },

    #[error("Unknown game '{0}'")]
    UnknownGame(String),

    #[error("IO error at {}: {message}", .path.display())]
    Io {
        message: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ModError {
    pub(crate) fn io(
        message: impl Into<String>,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        ModError::Io {
            message: message.into(),
            path: path.into(),
            source,
        }
    }

    /// Whether the error happened after the in-memory state already changed.
    pub fn is_persistence(&self) -> bool {
        matches!(self, ModError::Persistence { .. })
    }
}

pub type Result<T> = std::result::Result<T, ModError>;
