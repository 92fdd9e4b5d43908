//! ballotbot binary
//!
//! Wires the vote manager to a console channel: stdin lines are treated as
//! chat messages from the configured console user.

use ballotbot::channels::ConsoleChannel;
use ballotbot::cli::{self, Cli, Command, ConfigCommand};
use ballotbot::config;
use ballotbot::vote::{MemorySessionStore, VoteManager};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Start) {
        Command::Start => run_console(cli.config.as_deref()).await,
        Command::Config(ConfigCommand::Show) => cli::handle_config_show(cli.config.as_deref()),
        Command::Config(ConfigCommand::Path) => {
            cli::handle_config_path();
            Ok(())
        }
        Command::Version => {
            cli::handle_version();
            Ok(())
        }
    }
}

async fn run_console(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let cfg = match config_path {
        Some(path) => config::load_from(path)?,
        None => config::load()?,
    };
    ballotbot::logging::init(&cfg.logging)?;

    let store = Arc::new(MemorySessionStore::new());
    let outbound = Arc::new(ConsoleChannel::new());
    let manager = VoteManager::new(store, outbound, cfg.vote.clone());

    info!(scope = %cfg.console.scope, user = %cfg.console.username, "console channel ready");
    println!(
        "Vote commands go here (you are '{}' in scope '{}'; Ctrl-D to exit)",
        cfg.console.username, cfg.console.scope
    );

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(text)) => {
                        let result = manager
                            .handle_message(
                                &cfg.console.scope,
                                &cfg.console.username,
                                cfg.console.privileged,
                                text.trim(),
                            )
                            .await;
                        if let Err(e) = result {
                            error!(error = %e, "command failed");
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        error!(error = %e, "stdin read failed");
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    manager.shutdown();
    info!("console channel stopped");
    Ok(())
}
