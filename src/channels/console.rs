//! Console Channel
//!
//! Writes announcements and replies to stdout. Backs the `start` subcommand
//! and local demos; real deployments implement [`Outbound`] for their chat
//! transport instead.

use super::{ChannelResult, Outbound};
use async_trait::async_trait;

/// Stdout-backed channel
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleChannel;

impl ConsoleChannel {
    /// Create a new console channel
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Outbound for ConsoleChannel {
    async fn announce(&self, scope: &str, text: &str) -> ChannelResult<()> {
        println!("[{}] {}", scope, text);
        Ok(())
    }

    async fn reply(&self, scope: &str, username: &str, text: &str) -> ChannelResult<()> {
        println!("[{}] @{}: {}", scope, username, text);
        Ok(())
    }
}
