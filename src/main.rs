use anyhow::Result;
use clap::{Parser, Subcommand};
use modstage::{App, Config};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "modstage")]
#[command(
    author,
    version,
    about = "Stage, install and toggle game content packages"
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Game to operate on (defaults to the configured default game)
    #[arg(short, long, global = true)]
    game: Option<String>,

    /// Data directory override for this invocation
    #[arg(long, global = true)]
    data_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect configured games
    Game {
        #[command(subcommand)]
        action: GameCommands,
    },

    /// Manage the install queue
    Queue {
        #[command(subcommand)]
        action: QueueCommands,
    },

    /// Manage installed mods
    Mod {
        #[command(subcommand)]
        action: ModCommands,
    },

    /// Launch the game
    Launch {
        /// Launch mode: modded, vanilla
        #[arg(long, default_value = "modded")]
        mode: String,
    },
}

#[derive(Subcommand)]
enum GameCommands {
    /// List configured games
    List,
}

#[derive(Subcommand)]
enum QueueCommands {
    /// Extract an archive and queue it
    Add { path: String },
    /// List queued mods
    List,
    /// Drop a queued mod and its extracted files
    Remove { id: String },
    /// Install everything queued
    Process,
    /// Queue every package subdirectory of a directory
    Import { dir: String },
}

#[derive(Subcommand)]
enum ModCommands {
    /// List installed mods
    List,
    /// Delete an installed mod
    Remove { id: String },
    /// Flip a mod between enabled and disabled
    Toggle { id: String },
    /// Enable a mod
    Enable { id: String },
    /// Disable a mod
    Disable { id: String },
    /// Report records that disagree with the files on disk
    Audit,
}

fn setup_logging(verbosity: u8, log_dir: &Path) {
    let filter = match verbosity {
        0 => "modstage=info",
        1 => "modstage=debug",
        2 => "modstage=trace",
        _ => "trace",
    };

    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

    std::fs::create_dir_all(log_dir).ok();
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("modstage.log"));

    match file {
        Ok(file) => {
            let file_layer = tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(std::sync::Arc::new(file));
            let stderr_layer = tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(file_layer)
                .with(stderr_layer)
                .init();
        }
        Err(e) => {
            let stderr_layer = tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(stderr_layer)
                .init();
            tracing::warn!("Logging to stderr only, log file unavailable: {}", e);
        }
    }
}

/// Resolve `--data-dir` against the working directory so stored paths stay
/// valid from any later invocation.
fn absolute_data_dir(raw: &str) -> Result<PathBuf> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        anyhow::bail!("--data-dir cannot be empty");
    }
    let path = PathBuf::from(trimmed);
    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let data_dir = cli.data_dir.as_deref().map(absolute_data_dir).transpose()?;

    // Load configuration
    let mut config = Config::load().await?;
    if let Some(data_dir) = data_dir {
        config.set_data_dir(data_dir);
    }

    setup_logging(cli.verbose, &config.paths.log_dir());
    tracing::debug!("Data directory: {}", config.paths.data_dir().display());

    // Initialize app
    let app = App::new(config, cli.game).await?;

    match cli.command {
        Commands::Game { action } => match action {
            GameCommands::List => app.cmd_game_list().await?,
        },
        Commands::Queue { action } => match action {
            QueueCommands::Add { path } => app.cmd_queue_add(&path).await?,
            QueueCommands::List => app.cmd_queue_list().await?,
            QueueCommands::Remove { id } => app.cmd_queue_remove(&id).await?,
            QueueCommands::Process => app.cmd_queue_process().await?,
            QueueCommands::Import { dir } => app.cmd_queue_import(&dir).await?,
        },
        Commands::Mod { action } => match action {
            ModCommands::List => app.cmd_mod_list().await?,
            ModCommands::Remove { id } => app.cmd_mod_remove(&id).await?,
            ModCommands::Toggle { id } => app.cmd_mod_toggle(&id).await?,
            ModCommands::Enable { id } => app.cmd_mod_enable(&id).await?,
            ModCommands::Disable { id } => app.cmd_mod_disable(&id).await?,
            ModCommands::Audit => app.cmd_mod_audit().await?,
        },
        Commands::Launch { mode } => app.cmd_launch(&mode).await?,
    }

    Ok(())
}
