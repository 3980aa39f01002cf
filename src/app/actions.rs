//! CLI command action handlers

use super::App;
use crate::games::LaunchMode;
use crate::mods::{InstalledMod, QueuedMod};
use anyhow::{bail, Context, Result};
use std::path::Path;

fn print_queued(i: usize, m: &QueuedMod) {
    println!(
        "{:>3}. {} ({}) {} bytes\n     Preview: {}",
        i + 1,
        m.title,
        m.mod_id,
        m.weight,
        m.preview_ref
    );
}

fn print_installed(i: usize, m: &InstalledMod) {
    let status = if m.is_enabled() { "[x]" } else { "[ ]" };
    println!(
        "{:>3}. {} {} ({}) {} bytes",
        i + 1,
        status,
        m.title,
        m.mod_id,
        m.weight
    );
}

impl App {
    // ========== Game Commands ==========

    pub async fn cmd_game_list(&self) -> Result<()> {
        let games = self.mods.games().all();
        if games.is_empty() {
            println!(
                "No games configured. Add a [[games]] entry to {}",
                self.config.paths.config_file().display()
            );
            return Ok(());
        }

        let active = self.active_game().ok().map(|g| g.id.clone());

        println!("Configured Games:");
        println!("{:-<60}", "");
        for game in games {
            let marker = if Some(&game.id) == active.as_ref() {
                " [active]"
            } else {
                ""
            };
            println!(
                "  {} ({}){}\n    Path: {}",
                game.display_name(),
                game.id,
                marker,
                game.base_game_path.display()
            );
            match &game.game_exe {
                Some(exe) => println!("    Exe:  {}", exe.display()),
                None => println!("    Exe:  (not set)"),
            }
        }
        Ok(())
    }

    // ========== Queue Commands ==========

    pub async fn cmd_queue_add(&self, path: &str) -> Result<()> {
        let game = self.active_game()?;
        let path = Path::new(path);
        if !path.is_file() {
            bail!("Archive not found: {}", path.display());
        }

        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .context("Archive path has no file name")?;

        let queued = self
            .mods
            .enqueue_from_archive(&game.id, &bytes, filename)
            .await?;
        println!(
            "Queued '{}' ({}) for {}",
            queued.title,
            queued.mod_id,
            game.display_name()
        );
        Ok(())
    }

    pub async fn cmd_queue_list(&self) -> Result<()> {
        let game = self.active_game()?;
        let queued = self.mods.list_queued(&game.id).await?;

        if queued.is_empty() {
            println!("Queue is empty for {}.", game.display_name());
            return Ok(());
        }

        println!("Queued Mods for {}:", game.display_name());
        println!("{:-<60}", "");
        for (i, m) in queued.iter().enumerate() {
            print_queued(i, m);
        }
        Ok(())
    }

    pub async fn cmd_queue_remove(&self, mod_id: &str) -> Result<()> {
        let game = self.active_game()?;
        let removed = self.mods.remove_queued(&game.id, mod_id).await?;
        println!("Removed '{}' ({}) from the queue", removed.title, removed.mod_id);
        Ok(())
    }

    pub async fn cmd_queue_process(&self) -> Result<()> {
        let game = self.active_game()?;
        let report = self.mods.process_queue(&game.id).await?;

        if report.installed.is_empty()
            && report.discarded.is_empty()
            && report.failures.is_empty()
        {
            println!("Nothing queued for {}.", game.display_name());
            return Ok(());
        }

        println!(
            "Installed {} mod(s) for {}:",
            report.installed.len(),
            game.display_name()
        );
        println!("{:-<60}", "");
        for (i, m) in report.installed.iter().enumerate() {
            print_installed(i, m);
        }
        for id in &report.discarded {
            println!("  - {} already installed, discarded", id);
        }
        for (id, e) in &report.failures {
            println!("  ! {} failed: {}", id, e);
        }

        if !report.failures.is_empty() {
            bail!("{} mod(s) could not be installed", report.failures.len());
        }
        Ok(())
    }

    pub async fn cmd_queue_import(&self, dir: &str) -> Result<()> {
        let game = self.active_game()?;
        let imported = self
            .mods
            .import_from_directory(&game.id, Path::new(dir))
            .await?;

        if imported.is_empty() {
            println!("No new packages found in {}", dir);
            return Ok(());
        }

        println!("Imported {} package(s):", imported.len());
        println!("{:-<60}", "");
        for (i, m) in imported.iter().enumerate() {
            print_queued(i, m);
        }
        Ok(())
    }

    // ========== Mod Commands ==========

    pub async fn cmd_mod_list(&self) -> Result<()> {
        let game = self.active_game()?;
        let mods = self.mods.list_installed(&game.id).await?;

        if mods.is_empty() {
            println!("No mods installed for {}.", game.display_name());
            return Ok(());
        }

        println!("Installed Mods for {}:", game.display_name());
        println!("{:-<60}", "");
        for (i, m) in mods.iter().enumerate() {
            print_installed(i, m);
        }
        Ok(())
    }

    pub async fn cmd_mod_remove(&self, mod_id: &str) -> Result<()> {
        let game = self.active_game()?;
        let removed = self.mods.remove_installed(&game.id, mod_id).await?;
        println!("Removed '{}' ({})", removed.title, removed.mod_id);
        Ok(())
    }

    pub async fn cmd_mod_toggle(&self, mod_id: &str) -> Result<()> {
        let game = self.active_game()?;
        let m = self.mods.toggle_installed(&game.id, mod_id).await?;
        println!("'{}' is now {}", m.title, m.status);
        Ok(())
    }

    pub async fn cmd_mod_enable(&self, mod_id: &str) -> Result<()> {
        let game = self.active_game()?;
        let m = self.mods.enable_installed(&game.id, mod_id).await?;
        println!("Enabled: {}", m.title);
        Ok(())
    }

    pub async fn cmd_mod_disable(&self, mod_id: &str) -> Result<()> {
        let game = self.active_game()?;
        let m = self.mods.disable_installed(&game.id, mod_id).await?;
        println!("Disabled: {}", m.title);
        Ok(())
    }

    pub async fn cmd_mod_audit(&self) -> Result<()> {
        let game = self.active_game()?;
        let drifts = self.mods.audit(&game.id).await?;

        if drifts.is_empty() {
            println!(
                "All installed mods for {} are where they should be.",
                game.display_name()
            );
            return Ok(());
        }

        println!("Drift for {}:", game.display_name());
        println!("{:-<60}", "");
        for d in &drifts {
            println!("  {} [{}] {}", d.mod_id, d.status, d.kind);
            println!("    Recorded: {}", d.recorded.display());
            if let Some(found) = &d.found {
                println!("    Found:    {}", found.display());
            }
        }
        bail!("{} installed mod(s) need manual attention", drifts.len())
    }

    // ========== Launch ==========

    pub async fn cmd_launch(&self, mode: &str) -> Result<()> {
        let game = self.active_game()?;
        let mode = LaunchMode::from_cli(mode)?;
        let report = self.mods.launch(&game.id, mode).await?;

        if mode == LaunchMode::Vanilla {
            println!("Disabled {} mod(s) for a vanilla run", report.disabled.len());
            for (id, e) in &report.failures {
                println!("  ! {} still enabled: {}", id, e);
            }
        }
        println!(
            "Launched {} ({})",
            report.executable.display(),
            report.mode.as_str()
        );
        Ok(())
    }
}
