//! Drift between installed records and the files on disk
//!
//! Moves happen before the record is persisted, so an interrupted mutation
//! leaves the file in the opposite directory from what the record claims.
//! This module only reports; it never repairs.

use super::{file_name_of, InstallStore, ModStatus};
use crate::games::GameProfile;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftKind {
    /// Content file is nowhere to be found
    Missing,
    /// Content file sits in the directory of the other status
    InOppositeDir,
    /// Recorded path exists but outside the directory its status requires
    Misplaced,
}

impl DriftKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriftKind::Missing => "missing",
            DriftKind::InOppositeDir => "in-opposite-dir",
            DriftKind::Misplaced => "misplaced",
        }
    }
}

impl fmt::Display for DriftKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One inconsistent installed record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drift {
    pub mod_id: String,
    pub status: ModStatus,
    pub recorded: PathBuf,
    /// Where the file actually is, when it was located
    pub found: Option<PathBuf>,
    pub kind: DriftKind,
}

/// Check every installed record of `game` against the filesystem.
pub fn audit(store: &InstallStore, game: &GameProfile) -> Vec<Drift> {
    let layout = store.layout();
    let mut drifts = Vec::new();

    for installed in store.all().iter().filter(|m| m.game_id == game.id) {
        let expected_dir = layout.status_path(game, installed.status);
        let recorded = installed.path.clone();

        let drift = if recorded.is_file() {
            if recorded.parent() == Some(expected_dir.as_path()) {
                continue;
            }
            Drift {
                mod_id: installed.mod_id.clone(),
                status: installed.status,
                recorded: recorded.clone(),
                found: Some(recorded),
                kind: DriftKind::Misplaced,
            }
        } else {
            let opposite = layout
                .status_path(game, installed.status.toggled())
                .join(file_name_of(&recorded));
            let found = opposite.is_file().then_some(opposite);
            let kind = if found.is_some() {
                DriftKind::InOppositeDir
            } else {
                DriftKind::Missing
            };
            Drift {
                mod_id: installed.mod_id.clone(),
                status: installed.status,
                recorded,
                found,
                kind,
            }
        };

        tracing::warn!(
            "Drift for '{}' ({}): {} at {}",
            drift.mod_id,
            game.id,
            drift.kind,
            drift.recorded.display()
        );
        drifts.push(drift);
    }

    drifts
}
