//! On-disk record shapes

use crate::mods::{InstalledMod, QueuedMod};
use serde::{Deserialize, Serialize};

/// `mods.json`: every installed mod across all games, each tagged with its
/// game id. Per-game views are derived by filtering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstalledRecord {
    #[serde(default)]
    pub installed_mods: Vec<InstalledMod>,
}

/// `queue.json`: the queue as of its last mutation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueRecord {
    #[serde(default)]
    pub queued_mods: Vec<QueuedMod>,
}
