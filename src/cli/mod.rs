//! CLI module: command parsing and dispatch
//!
//! All CLI logic lives here. `main.rs` calls `cli::run()`.

pub mod config;
pub mod games;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};

use gamestore_bridge::config::Config;
use gamestore_bridge::gateway::Source;

#[derive(Parser)]
#[command(name = "gamestore")]
#[command(version)]
#[command(about = "Query the GameStore agents from the command line", long_about = None)]
struct Cli {
    /// Config file (defaults to ~/.gamestore/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search a game by title (primary store first, then the distributor)
    Search {
        /// Title or part of it; quotes are ignored
        title: String,
    },
    /// List every game of one or both sources
    List {
        #[arg(long, value_enum, default_value_t = Source::Both)]
        source: Source,
    },
    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration (file + environment overrides)
    Show,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Validate the configuration
    Check,
}

/// Loads config from `path`, or the default location.
pub(crate) fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(Config::path);
    Config::load_from_path(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

pub async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Logging follows the config; a broken config still gets default logging
    // so the load error itself is reported.
    let config = load_config(cli.config.as_deref());
    let logging_cfg = config
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_default();
    gamestore_bridge::utils::logging::init_logging(&logging_cfg)
        .context("Failed to initialize logging")?;

    match cli.command {
        None => {
            let mut cmd = Cli::command();
            cmd.print_help()?;
            println!();
        }
        Some(Commands::Search { title }) => {
            games::cmd_search(&config?, &title).await?;
        }
        Some(Commands::List { source }) => {
            games::cmd_list(&config?, source).await?;
        }
        Some(Commands::Config { action }) => {
            config::cmd_config(action, cli.config.as_deref()).await?;
        }
    }

    Ok(())
}
