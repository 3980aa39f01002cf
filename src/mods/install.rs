//! Installed mods: guarded file moves paired with persisted state
//!
//! Every mutation moves the file first, then updates the in-memory record,
//! then persists the whole collection. After a crash between the move and the
//! persist the disk is ahead of the record; `audit` reports that drift.

use super::{file_name_of, InstalledMod, ModKey, ModLayout, ModStatus, QueuedMod};
use crate::db::ModRecordStore;
use crate::error::{ModError, Result};
use crate::games::GameProfile;
use chrono::Utc;
use std::io;
use std::path::Path;

/// Result of committing a queued mod
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Newly installed and enabled
    Installed(InstalledMod),
    /// Same (game, id) already installed; nothing copied
    AlreadyInstalled,
}

/// Per-mod results of disabling everything for a game
#[derive(Debug, Default)]
pub struct BulkDisableReport {
    pub disabled: Vec<InstalledMod>,
    pub failures: Vec<(String, ModError)>,
}

/// The installed-mod collection for all games plus its durable record.
pub struct InstallStore {
    mods: Vec<InstalledMod>,
    record: Box<dyn ModRecordStore>,
    layout: ModLayout,
}

impl InstallStore {
    /// Load the collection from `record`. Never fails: a missing or broken
    /// record starts an empty collection.
    pub fn open(record: Box<dyn ModRecordStore>, layout: ModLayout) -> Self {
        let mods = record.load();
        tracing::info!(
            "Loaded {} installed mod(s) from {}",
            mods.len(),
            record.location().display()
        );
        Self {
            mods,
            record,
            layout,
        }
    }

    pub fn layout(&self) -> &ModLayout {
        &self.layout
    }

    /// Installed mods across every game
    pub fn all(&self) -> &[InstalledMod] {
        &self.mods
    }

    /// Installed mods of one game, in install order
    pub fn list(&self, game_id: &str) -> Vec<InstalledMod> {
        self.mods
            .iter()
            .filter(|m| m.game_id == game_id)
            .cloned()
            .collect()
    }

    pub fn get(&self, key: &ModKey) -> Option<&InstalledMod> {
        self.mods.iter().find(|m| m.has_key(key))
    }

    pub fn contains(&self, key: &ModKey) -> bool {
        self.get(key).is_some()
    }

    fn position(&self, game: &GameProfile, mod_id: &str) -> Result<usize> {
        let key = ModKey::new(&game.id, mod_id);
        self.mods
            .iter()
            .position(|m| m.has_key(&key))
            .ok_or(ModError::NotFound {
                game_id: key.game_id,
                mod_id: key.mod_id,
            })
    }

    fn persist(&self) -> Result<()> {
        self.record.save(&self.mods)
    }

    /// Install a queued mod as enabled.
    ///
    /// Copies the content file into the active directory and the preview into
    /// the misc directory, then drops the scratch content and metadata files.
    /// An already-installed (game, id) pair discards the scratch directory
    /// instead and succeeds.
    pub fn commit(&mut self, queued: &QueuedMod, game: &GameProfile) -> Result<CommitOutcome> {
        if self.contains(&queued.key()) {
            tracing::info!(
                "Mod '{}' already installed for {}, discarding queued copy",
                queued.mod_id,
                game.id
            );
            crate::queue::remove_scratch_dir(&queued.scratch_dir);
            return Ok(CommitOutcome::AlreadyInstalled);
        }

        let active = self.layout.resolve_active_path(game)?;
        let misc = self.layout.resolve_misc_path(game)?;

        let source = queued.content_path();
        let target = active.join(file_name_of(&queued.content_file));
        copy_new(&source, &target).map_err(|e| ModError::FileMove {
            from: source.clone(),
            to: target.clone(),
            source: e,
        })?;

        let preview_source = queued.preview_path();
        let preview_name = format!(
            "{}_{}",
            queued.mod_id,
            file_name_of(&queued.preview_file).display()
        );
        let preview_target = misc.join(preview_name);
        if let Err(e) = move_file(&preview_source, &preview_target, true) {
            discard_file(&target);
            return Err(ModError::FileMove {
                from: preview_source,
                to: preview_target,
                source: e,
            });
        }

        discard_file(&source);
        discard_file(&queued.metadata_path());

        let installed = InstalledMod {
            mod_id: queued.mod_id.clone(),
            game_id: game.id.clone(),
            title: queued.title.clone(),
            weight: queued.weight,
            path: target,
            status: ModStatus::Enabled,
            installed_at: Utc::now(),
            preview_ref: self.layout.relative_ref(&preview_target),
        };
        self.mods.push(installed.clone());
        self.persist()?;

        tracing::info!(
            "Installed '{}' ({}) for {}",
            installed.title,
            installed.mod_id,
            game.id
        );
        Ok(CommitOutcome::Installed(installed))
    }

    /// Delete the content file at its recorded location, then the record.
    pub fn remove(&mut self, game: &GameProfile, mod_id: &str) -> Result<InstalledMod> {
        let index = self.position(game, mod_id)?;
        let path = self.mods[index].path.clone();

        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::warn!("Content file {} already missing", path.display());
            }
            Err(e) => return Err(ModError::io("Failed to remove content file", path, e)),
        }

        let removed = self.mods.remove(index);
        discard_file(&self.layout.absolute_ref(&removed.preview_ref));
        self.persist()?;

        tracing::info!("Removed '{}' ({}) from {}", removed.title, mod_id, game.id);
        Ok(removed)
    }

    pub fn enable(&mut self, game: &GameProfile, mod_id: &str) -> Result<InstalledMod> {
        self.set_status(game, mod_id, ModStatus::Enabled)
    }

    pub fn disable(&mut self, game: &GameProfile, mod_id: &str) -> Result<InstalledMod> {
        self.set_status(game, mod_id, ModStatus::Disabled)
    }

    /// Flip enabled/disabled
    pub fn toggle(&mut self, game: &GameProfile, mod_id: &str) -> Result<InstalledMod> {
        let index = self.position(game, mod_id)?;
        let target = self.mods[index].status.toggled();
        self.set_status(game, mod_id, target)
    }

    /// Move the content file into the directory for `status` and record it.
    ///
    /// The move is always attempted, even when the record already has
    /// `status`. A failed move leaves the record untouched.
    pub fn set_status(
        &mut self,
        game: &GameProfile,
        mod_id: &str,
        status: ModStatus,
    ) -> Result<InstalledMod> {
        let index = self.position(game, mod_id)?;
        let target_dir = self.layout.resolve_status_path(game, status)?;

        let from = self.mods[index].path.clone();
        let to = target_dir.join(file_name_of(&from));
        move_file(&from, &to, false).map_err(|e| ModError::FileMove {
            from: from.clone(),
            to: to.clone(),
            source: e,
        })?;

        let entry = &mut self.mods[index];
        entry.path = to;
        entry.status = status;
        let updated = entry.clone();
        self.persist()?;

        tracing::info!("Mod '{}' for {} is now {}", mod_id, game.id, status);
        Ok(updated)
    }

    /// Disable every enabled mod of `game`, each independently.
    pub fn bulk_disable(&mut self, game: &GameProfile) -> BulkDisableReport {
        let enabled: Vec<String> = self
            .mods
            .iter()
            .filter(|m| m.game_id == game.id && m.is_enabled())
            .map(|m| m.mod_id.clone())
            .collect();

        let mut report = BulkDisableReport::default();
        for mod_id in enabled {
            match self.disable(game, &mod_id) {
                Ok(m) => report.disabled.push(m),
                Err(e) => {
                    tracing::warn!("Failed to disable '{}' for {}: {}", mod_id, game.id, e);
                    report.failures.push((mod_id, e));
                }
            }
        }
        report
    }
}

/// Copy to a path that must not exist yet.
fn copy_new(from: &Path, to: &Path) -> io::Result<()> {
    if to.exists() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} already exists", to.display()),
        ));
    }
    std::fs::copy(from, to).map(|_| ())
}

/// Rename, falling back to copy + remove across filesystems.
///
/// Refuses to replace a different existing file unless `overwrite` is set.
pub(crate) fn move_file(from: &Path, to: &Path, overwrite: bool) -> io::Result<()> {
    if !from.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} does not exist", from.display()),
        ));
    }
    if from == to {
        return Ok(());
    }
    if to.exists() && !overwrite {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} already exists", to.display()),
        ));
    }

    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }

    std::fs::copy(from, to)?;
    if let Err(e) = std::fs::remove_file(from) {
        discard_file(to);
        return Err(e);
    }
    Ok(())
}

fn discard_file(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove {}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{JsonRecordFile, MockModRecordStore};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        game: GameProfile,
        layout: ModLayout,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let data = dir.path().join("data");
            let game = GameProfile::new("alpha", dir.path().join("game"));
            let layout = ModLayout::new(&data, data.join("disabled"), data.join("misc"));
            Self { dir, game, layout }
        }

        fn record(&self) -> JsonRecordFile {
            JsonRecordFile::new(self.dir.path().join("data/mods.json"))
        }

        fn store(&self) -> InstallStore {
            InstallStore::open(Box::new(self.record()), self.layout.clone())
        }

        fn queued(&self, mod_id: &str, content_name: &str) -> QueuedMod {
            let scratch = self.dir.path().join("data/temp").join(mod_id);
            fs::create_dir_all(&scratch).unwrap();
            fs::write(scratch.join(content_name), b"content").unwrap();
            fs::write(scratch.join("cover.jpg"), b"jpg").unwrap();
            fs::write(scratch.join("info.txt"), b"#x#Title#").unwrap();
            QueuedMod {
                mod_id: mod_id.to_string(),
                game_id: self.game.id.clone(),
                title: "Title".to_string(),
                content_file: PathBuf::from(content_name),
                weight: 7,
                preview_file: PathBuf::from("cover.jpg"),
                metadata_file: PathBuf::from("info.txt"),
                scratch_dir: scratch,
                preview_ref: String::new(),
                queued_at: Utc::now(),
            }
        }

        fn installed(&self, store: &mut InstallStore, mod_id: &str) -> InstalledMod {
            let queued = self.queued(mod_id, &format!("{}.gro", mod_id));
            match store.commit(&queued, &self.game).unwrap() {
                CommitOutcome::Installed(m) => m,
                other => panic!("unexpected outcome: {other:?}"),
            }
        }
    }

    #[test]
    fn commit_places_files_and_persists() {
        let fx = Fixture::new();
        let mut store = fx.store();
        let queued = fx.queued("1042", "map.gro");

        let installed = match store.commit(&queued, &fx.game).unwrap() {
            CommitOutcome::Installed(m) => m,
            other => panic!("unexpected outcome: {other:?}"),
        };

        assert_eq!(installed.status, ModStatus::Enabled);
        assert_eq!(installed.path, fx.layout.active_path(&fx.game).join("map.gro"));
        assert!(installed.path.is_file());
        assert_eq!(installed.preview_ref, "misc/alpha/1042_cover.jpg");
        assert!(fx.layout.absolute_ref(&installed.preview_ref).is_file());
        assert!(!queued.content_path().exists());
        assert!(!queued.metadata_path().exists());
        assert_eq!(fx.record().load(), store.all());
    }

    #[test]
    fn commit_of_installed_id_copies_nothing() {
        let fx = Fixture::new();
        let mut store = fx.store();
        fx.installed(&mut store, "1");

        let again = fx.queued("1", "other.gro");
        assert_eq!(
            store.commit(&again, &fx.game).unwrap(),
            CommitOutcome::AlreadyInstalled
        );
        assert!(!fx.layout.active_path(&fx.game).join("other.gro").exists());
        assert!(!again.scratch_dir.exists());
        assert_eq!(store.list("alpha").len(), 1);
    }

    #[test]
    fn commit_refuses_to_overwrite_another_mods_file() {
        let fx = Fixture::new();
        let mut store = fx.store();
        let first = fx.queued("1", "shared.gro");
        store.commit(&first, &fx.game).unwrap();

        let second = fx.queued("2", "shared.gro");
        let err = store.commit(&second, &fx.game).unwrap_err();
        assert!(matches!(err, ModError::FileMove { .. }));
        assert!(!store.contains(&ModKey::new("alpha", "2")));
        assert!(second.content_path().exists());
    }

    #[test]
    fn toggle_round_trips_status_and_directory() {
        let fx = Fixture::new();
        let mut store = fx.store();
        let original = fx.installed(&mut store, "7");

        let disabled = store.toggle(&fx.game, "7").unwrap();
        assert_eq!(disabled.status, ModStatus::Disabled);
        assert_eq!(disabled.path.parent().unwrap(), fx.layout.disabled_path(&fx.game));
        assert!(disabled.path.is_file());
        assert!(!original.path.exists());

        let enabled = store.toggle(&fx.game, "7").unwrap();
        assert_eq!(enabled.status, ModStatus::Enabled);
        assert_eq!(enabled.path, original.path);
        assert!(enabled.path.is_file());
        assert_eq!(fx.record().load(), store.all());
    }

    #[test]
    fn enabling_an_enabled_mod_keeps_it_in_place() {
        let fx = Fixture::new();
        let mut store = fx.store();
        let original = fx.installed(&mut store, "7");

        let enabled = store.enable(&fx.game, "7").unwrap();
        assert_eq!(enabled.path, original.path);
        assert!(enabled.path.is_file());
    }

    #[test]
    fn missing_source_file_leaves_record_unchanged() {
        let fx = Fixture::new();
        let mut store = fx.store();
        let original = fx.installed(&mut store, "7");
        fs::remove_file(&original.path).unwrap();

        let err = store.disable(&fx.game, "7").unwrap_err();
        assert!(matches!(err, ModError::FileMove { .. }));
        assert_eq!(store.get(&ModKey::new("alpha", "7")), Some(&original));
        assert_eq!(fx.record().load(), store.all());
    }

    #[test]
    fn unknown_mod_is_not_found() {
        let fx = Fixture::new();
        let mut store = fx.store();
        assert!(matches!(
            store.toggle(&fx.game, "nope"),
            Err(ModError::NotFound { .. })
        ));
        assert!(matches!(
            store.remove(&fx.game, "nope"),
            Err(ModError::NotFound { .. })
        ));
    }

    #[test]
    fn remove_deletes_file_at_current_location() {
        let fx = Fixture::new();
        let mut store = fx.store();
        fx.installed(&mut store, "7");
        let disabled = store.disable(&fx.game, "7").unwrap();

        store.remove(&fx.game, "7").unwrap();
        assert!(!disabled.path.exists());
        assert!(store.list("alpha").is_empty());
        assert!(fx.record().load().is_empty());
    }

    #[test]
    fn bulk_disable_continues_past_failures() {
        let fx = Fixture::new();
        let mut store = fx.store();
        let broken = fx.installed(&mut store, "1");
        fx.installed(&mut store, "2");
        fx.installed(&mut store, "3");
        fs::remove_file(&broken.path).unwrap();

        let report = store.bulk_disable(&fx.game);
        assert_eq!(report.disabled.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, "1");
        assert!(store.get(&ModKey::new("alpha", "1")).unwrap().is_enabled());
    }

    #[test]
    fn reopened_store_sees_persisted_state() {
        let fx = Fixture::new();
        let mut store = fx.store();
        fx.installed(&mut store, "1");
        store.disable(&fx.game, "1").unwrap();

        let reopened = fx.store();
        assert_eq!(reopened.all(), store.all());
        assert_eq!(
            reopened.get(&ModKey::new("alpha", "1")).unwrap().status,
            ModStatus::Disabled
        );
    }

    #[test]
    fn persistence_failure_is_surfaced_after_the_move() {
        let fx = Fixture::new();
        let mut record = MockModRecordStore::new();
        record.expect_load().returning(Vec::new);
        record
            .expect_location()
            .returning(|| PathBuf::from("mods.json"));
        record.expect_save().returning(|_| {
            Err(ModError::Persistence {
                path: PathBuf::from("mods.json"),
                message: "disk full".to_string(),
            })
        });
        let mut store = InstallStore::open(Box::new(record), fx.layout.clone());

        let queued = fx.queued("1", "map.gro");
        let err = store.commit(&queued, &fx.game).unwrap_err();
        assert!(err.is_persistence());
        assert!(store.contains(&ModKey::new("alpha", "1")));
        assert!(fx.layout.active_path(&fx.game).join("map.gro").is_file());
    }
}
