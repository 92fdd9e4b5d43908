//! Channel Abstractions
//!
//! Defines the outbound interface the vote machinery talks to. Transports
//! (Discord, Slack, a console...) implement [`Outbound`]; the core never
//! sees anything else.

pub mod console;

pub use console::ConsoleChannel;

use async_trait::async_trait;
use std::sync::Arc;

/// Result type for channel operations
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Errors that can occur when delivering messages
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Message send failed: {0}")]
    SendFailed(String),

    #[error("Channel not connected")]
    NotConnected,

    #[error("Channel error: {0}")]
    Other(String),
}

/// Outbound messaging capability.
///
/// `announce` posts to the whole scope (room/channel); `reply` addresses a
/// single user within that scope.
#[async_trait]
pub trait Outbound: Send + Sync {
    /// Post a message visible to the whole scope.
    async fn announce(&self, scope: &str, text: &str) -> ChannelResult<()>;

    /// Address a single user within the scope.
    async fn reply(&self, scope: &str, username: &str, text: &str) -> ChannelResult<()>;
}

/// Type-erased outbound channel for storage
pub type DynOutbound = Arc<dyn Outbound>;
