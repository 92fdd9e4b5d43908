//! CLI subcommand definitions and handlers.
//!
//! Uses clap derive to define the subcommand hierarchy:
//! - `start` (default) -- run the console channel loop
//! - `config show|path` -- inspect configuration
//! - `version` -- print build/version info

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ballotbot: vote sessions for chat rooms.
#[derive(Parser, Debug)]
#[command(
    name = "ballotbot",
    version = env!("CARGO_PKG_VERSION"),
    about = "ballotbot: chat vote sessions with a countdown"
)]
pub struct Cli {
    /// Path to a config file (default: the platform config dir).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the console channel loop (default when no subcommand is given).
    Start,

    /// Read configuration values.
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Print version, build date, and git commit information.
    Version,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the fully loaded configuration as JSON.
    Show,

    /// Print the resolved configuration file path.
    Path,
}

// ---------------------------------------------------------------------------
// Subcommand handlers
// ---------------------------------------------------------------------------

use crate::config;
use std::path::Path;

/// Run the `config show` subcommand.
pub fn handle_config_show(path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let cfg = match path {
        Some(p) => config::load_from(p)?,
        None => config::load()?,
    };
    let pretty = serde_json::to_string_pretty(&cfg)?;
    println!("{}", pretty);
    Ok(())
}

/// Run the `config path` subcommand.
pub fn handle_config_path() {
    println!("{}", config::config_path().display());
}

/// Run the `version` subcommand.
pub fn handle_version() {
    println!(
        "ballotbot {} ({} {})",
        env!("CARGO_PKG_VERSION"),
        env!("BALLOTBOT_GIT_HASH"),
        env!("BALLOTBOT_BUILD_DATE"),
    );
}
