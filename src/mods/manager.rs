//! Lifecycle orchestration across the queue and the installed collection
//!
//! Every mutating call holds its game's mutex for its whole duration, so two
//! mutations of the same game never interleave. Store locks are always taken
//! queue first, then installed.

use super::{
    audit, extract, fallback_mod_id, inspect_dir, mod_id_from_filename, ArchiveFormat,
    CommitOutcome, Drift, ExtractedMod, InstallStore, InstalledMod, ModKey, ModLayout, QueuedMod,
};
use crate::config::Config;
use crate::db::JsonRecordFile;
use crate::error::{ModError, Result};
use crate::games::{
    resolve_executable, DetachedSpawner, GameProfile, GameRegistry, LaunchMode, ProcessSpawner,
};
use crate::queue::{remove_scratch_dir, QueueStore};
use chrono::Utc;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// Outcome of processing a game's queue
#[derive(Debug, Default)]
pub struct QueueReport {
    /// Mods newly installed by this pass
    pub installed: Vec<InstalledMod>,
    /// Ids dropped because they were already installed
    pub discarded: Vec<String>,
    pub failures: Vec<(String, ModError)>,
}

/// Outcome of a launch
#[derive(Debug)]
pub struct LaunchReport {
    pub mode: LaunchMode,
    pub executable: PathBuf,
    /// Mods disabled before a vanilla launch
    pub disabled: Vec<InstalledMod>,
    pub failures: Vec<(String, ModError)>,
}

/// Owns the queue and install stores and drives mods between them.
pub struct ModManager {
    games: GameRegistry,
    layout: ModLayout,
    scratch_root: PathBuf,
    queue: RwLock<QueueStore>,
    installed: RwLock<InstallStore>,
    game_locks: std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>,
    spawner: Box<dyn ProcessSpawner>,
}

impl ModManager {
    pub fn new(
        games: GameRegistry,
        scratch_root: impl Into<PathBuf>,
        queue: QueueStore,
        installed: InstallStore,
        spawner: Box<dyn ProcessSpawner>,
    ) -> Self {
        Self {
            games,
            layout: installed.layout().clone(),
            scratch_root: scratch_root.into(),
            queue: RwLock::new(queue),
            installed: RwLock::new(installed),
            game_locks: std::sync::Mutex::new(HashMap::new()),
            spawner,
        }
    }

    /// Open the on-disk stores under the configured data dir.
    pub fn from_config(config: &Config) -> Self {
        let scratch_root = config.paths.scratch_dir();
        let queue = QueueStore::open(config.paths.queue_file(), &scratch_root);
        let installed = InstallStore::open(
            Box::new(JsonRecordFile::new(config.paths.installed_file())),
            ModLayout::from_config(config),
        );
        Self::new(
            config.registry(),
            scratch_root,
            queue,
            installed,
            Box::new(DetachedSpawner),
        )
    }

    pub fn with_spawner(mut self, spawner: Box<dyn ProcessSpawner>) -> Self {
        self.spawner = spawner;
        self
    }

    pub fn games(&self) -> &GameRegistry {
        &self.games
    }

    fn game(&self, game_id: &str) -> Result<&GameProfile> {
        self.games.resolve(Some(game_id))
    }

    fn game_lock(&self, game_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.game_locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(game_id.to_string()).or_default().clone()
    }

    // ========== Queue ==========

    /// Extract an uploaded archive into a fresh scratch directory and queue it.
    ///
    /// The identifier comes from `filename` when it matches the package
    /// naming scheme, else a fallback id is generated. Nothing is left under
    /// the scratch root on failure.
    pub async fn enqueue_from_archive(
        &self,
        game_id: &str,
        bytes: &[u8],
        filename: &str,
    ) -> Result<QueuedMod> {
        let game = self.game(game_id)?;
        let lock = self.game_lock(&game.id);
        let _guard = lock.lock().await;

        let name = Path::new(filename)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(filename);
        let mod_id = mod_id_from_filename(name).unwrap_or_else(|| {
            let id = fallback_mod_id();
            tracing::debug!("'{}' has no id in its name, using {}", name, id);
            id
        });

        if self.queue.read().await.contains(&ModKey::new(&game.id, &mod_id)) {
            return Err(ModError::DuplicateQueued {
                game_id: game.id.clone(),
                mod_id,
            });
        }

        let format = match ArchiveFormat::from_path(Path::new(name)) {
            ArchiveFormat::Unknown => ArchiveFormat::sniff(bytes),
            known => known,
        };
        if format == ArchiveFormat::Unknown {
            return Err(ModError::UnsupportedArchive {
                name: name.to_string(),
            });
        }

        let token = Uuid::new_v4().to_string();
        let scratch_dir = self.scratch_root.join(&token);
        let spool = self
            .scratch_root
            .join(format!("{}.{}", token, format.extension()));

        tokio::fs::create_dir_all(&self.scratch_root)
            .await
            .map_err(|e| ModError::io("Failed to create scratch root", &self.scratch_root, e))?;
        tokio::fs::write(&spool, bytes)
            .await
            .map_err(|e| ModError::io("Failed to spool upload", &spool, e))?;

        tracing::info!(
            "Extracting '{}' for {} into {}",
            name,
            game.id,
            scratch_dir.display()
        );
        let extracted = extract(&spool, format, &scratch_dir);
        if let Err(e) = tokio::fs::remove_file(&spool).await {
            tracing::warn!("Failed to remove spooled upload {}: {}", spool.display(), e);
        }

        let extracted = match extracted {
            Ok(extracted) => extracted,
            Err(e) => {
                remove_scratch_dir(&scratch_dir);
                return Err(e);
            }
        };

        self.stage(game, mod_id, extracted, scratch_dir).await
    }

    /// Turn an inspected scratch directory into a queue entry.
    async fn stage(
        &self,
        game: &GameProfile,
        mod_id: String,
        extracted: ExtractedMod,
        scratch_dir: PathBuf,
    ) -> Result<QueuedMod> {
        let queued = QueuedMod {
            preview_ref: self
                .layout
                .relative_ref(&scratch_dir.join(&extracted.preview_file)),
            mod_id,
            game_id: game.id.clone(),
            title: extracted.title,
            content_file: extracted.content_file,
            weight: extracted.weight,
            preview_file: extracted.preview_file,
            metadata_file: extracted.metadata_file,
            scratch_dir,
            queued_at: Utc::now(),
        };

        if let Err(e) = self.queue.write().await.enqueue(queued.clone()) {
            remove_scratch_dir(&queued.scratch_dir);
            return Err(e);
        }

        tracing::info!("Queued '{}' ({}) for {}", queued.title, queued.mod_id, game.id);
        Ok(queued)
    }

    pub async fn list_queued(&self, game_id: &str) -> Result<Vec<QueuedMod>> {
        let game = self.game(game_id)?;
        Ok(self.queue.read().await.list(&game.id))
    }

    pub async fn remove_queued(&self, game_id: &str, mod_id: &str) -> Result<QueuedMod> {
        let game = self.game(game_id)?;
        let lock = self.game_lock(&game.id);
        let _guard = lock.lock().await;

        self.queue
            .write()
            .await
            .dequeue(&ModKey::new(&game.id, mod_id))
    }

    /// Commit every queued mod of a game.
    ///
    /// Installed and already-installed mods leave the queue. A mod whose
    /// commit fails before it was recorded stays queued with its scratch
    /// directory; a persistence failure still consumes it, as the install
    /// already happened.
    pub async fn process_queue(&self, game_id: &str) -> Result<QueueReport> {
        let game = self.game(game_id)?;
        let lock = self.game_lock(&game.id);
        let _guard = lock.lock().await;

        let pending = self.queue.read().await.list(&game.id);
        let mut report = QueueReport::default();

        for queued in pending {
            let mut queue = self.queue.write().await;
            let mut installed = self.installed.write().await;

            let outcome = installed.commit(&queued, game);
            let consumed = match &outcome {
                Ok(_) => true,
                Err(e) => e.is_persistence(),
            };
            if consumed {
                if let Err(e) = queue.dequeue(&queued.key()) {
                    tracing::warn!(
                        "Queue entry {} vanished during processing: {}",
                        queued.key(),
                        e
                    );
                }
            }

            match outcome {
                Ok(CommitOutcome::Installed(m)) => report.installed.push(m),
                Ok(CommitOutcome::AlreadyInstalled) => report.discarded.push(queued.mod_id),
                Err(e) => {
                    tracing::error!("Failed to install {}: {}", queued.key(), e);
                    report.failures.push((queued.mod_id, e));
                }
            }
        }

        tracing::info!(
            "Processed queue for {}: {} installed, {} discarded, {} failed",
            game.id,
            report.installed.len(),
            report.discarded.len(),
            report.failures.len()
        );
        Ok(report)
    }

    /// Queue every package subdirectory of `source` not yet known for the
    /// game. Each subdirectory's name is its identifier; subdirectories
    /// lacking a required file are skipped.
    pub async fn import_from_directory(
        &self,
        game_id: &str,
        source: &Path,
    ) -> Result<Vec<QueuedMod>> {
        let game = self.game(game_id)?;
        let lock = self.game_lock(&game.id);
        let _guard = lock.lock().await;

        let mut candidates: Vec<(String, PathBuf)> = std::fs::read_dir(source)
            .map_err(|e| ModError::io("Failed to read import directory", source, e))?
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .filter_map(|e| Some((e.file_name().to_str()?.to_string(), e.path())))
            .collect();
        candidates.sort();

        let mut imported = Vec::new();
        for (mod_id, dir) in candidates {
            let key = ModKey::new(&game.id, &mod_id);
            let known = self.queue.read().await.contains(&key)
                || self.installed.read().await.contains(&key);
            if known {
                tracing::debug!("Skipping '{}': already known for {}", mod_id, game.id);
                continue;
            }

            if let Err(e) = inspect_dir(&dir) {
                match e {
                    ModError::MalformedArchive { .. } => {
                        tracing::debug!("Skipping {}: {}", dir.display(), e)
                    }
                    other => tracing::warn!("Skipping {}: {}", dir.display(), other),
                }
                continue;
            }

            let scratch_dir = self.scratch_root.join(Uuid::new_v4().to_string());
            if let Err(e) = copy_dir_recursive(&dir, &scratch_dir) {
                remove_scratch_dir(&scratch_dir);
                return Err(ModError::io("Failed to copy package", dir, e));
            }
            let extracted = match inspect_dir(&scratch_dir) {
                Ok(extracted) => extracted,
                Err(e) => {
                    remove_scratch_dir(&scratch_dir);
                    return Err(e);
                }
            };

            imported.push(self.stage(game, mod_id, extracted, scratch_dir).await?);
        }

        tracing::info!(
            "Imported {} mod(s) for {} from {}",
            imported.len(),
            game.id,
            source.display()
        );
        Ok(imported)
    }

    // ========== Installed ==========

    pub async fn list_installed(&self, game_id: &str) -> Result<Vec<InstalledMod>> {
        let game = self.game(game_id)?;
        Ok(self.installed.read().await.list(&game.id))
    }

    pub async fn remove_installed(&self, game_id: &str, mod_id: &str) -> Result<InstalledMod> {
        let game = self.game(game_id)?;
        let lock = self.game_lock(&game.id);
        let _guard = lock.lock().await;

        self.installed.write().await.remove(game, mod_id)
    }

    pub async fn toggle_installed(&self, game_id: &str, mod_id: &str) -> Result<InstalledMod> {
        let game = self.game(game_id)?;
        let lock = self.game_lock(&game.id);
        let _guard = lock.lock().await;

        self.installed.write().await.toggle(game, mod_id)
    }

    pub async fn enable_installed(&self, game_id: &str, mod_id: &str) -> Result<InstalledMod> {
        let game = self.game(game_id)?;
        let lock = self.game_lock(&game.id);
        let _guard = lock.lock().await;

        self.installed.write().await.enable(game, mod_id)
    }

    pub async fn disable_installed(&self, game_id: &str, mod_id: &str) -> Result<InstalledMod> {
        let game = self.game(game_id)?;
        let lock = self.game_lock(&game.id);
        let _guard = lock.lock().await;

        self.installed.write().await.disable(game, mod_id)
    }

    /// Report installed records whose file is not where the record says.
    pub async fn audit(&self, game_id: &str) -> Result<Vec<Drift>> {
        let game = self.game(game_id)?;
        let lock = self.game_lock(&game.id);
        let _guard = lock.lock().await;

        Ok(audit(&*self.installed.read().await, game))
    }

    // ========== Launch ==========

    /// Start the game. Vanilla mode disables every enabled mod first and
    /// persists that before the process is spawned.
    pub async fn launch(&self, game_id: &str, mode: LaunchMode) -> Result<LaunchReport> {
        let game = self.game(game_id)?;
        let lock = self.game_lock(&game.id);
        let _guard = lock.lock().await;

        let executable = resolve_executable(game)?;

        let mut report = LaunchReport {
            mode,
            executable,
            disabled: Vec::new(),
            failures: Vec::new(),
        };

        if mode == LaunchMode::Vanilla {
            let bulk = self.installed.write().await.bulk_disable(game);
            if !bulk.failures.is_empty() {
                tracing::warn!(
                    "{} mod(s) could not be disabled for {}, launching anyway",
                    bulk.failures.len(),
                    game.id
                );
            }
            report.disabled = bulk.disabled;
            report.failures = bulk.failures;
        }

        tracing::info!("Launching {} ({})", game.id, mode.as_str());
        self.spawner
            .spawn_detached(&report.executable)
            .map_err(|e| ModError::io("Failed to launch game", &report.executable, e))?;

        Ok(report)
    }
}

/// Copy directory recursively
fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dst)?;

    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }

    Ok(())
}
