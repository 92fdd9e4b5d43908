//! Command Handlers
//!
//! [`VoteManager`] owns the store, the outbound channel, and the countdown
//! registry, and applies the validation rules guarding each lifecycle
//! transition. Every handler serializes load-mutate-save on a per-scope
//! mutex so concurrent commands (and countdown ticks) cannot lose updates.

use super::clock::{Clock, SystemClock};
use super::countdown::{start_countdown, CountdownContext, CountdownRegistry};
use super::session::VoteSession;
use super::store::{SessionStore, StoreError};
use crate::channels::{ChannelError, Outbound};
use crate::commands::{self, VoteCommand};
use crate::config::VoteConfig;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Errors surfaced by vote handlers.
///
/// Validation outcomes are not errors; handlers reply to the user and
/// return `Ok`. Only infrastructure failures end up here.
#[derive(Debug, thiserror::Error)]
pub enum VoteError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// Result type for vote handlers
pub type VoteResult<T> = Result<T, VoteError>;

/// Per-scope async mutexes guarding load-mutate-save sequences.
#[derive(Default)]
pub(crate) struct ScopeLocks {
    inner: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ScopeLocks {
    pub(crate) fn for_scope(&self, scope: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut inner = self.inner.lock();
        Arc::clone(inner.entry(scope.to_string()).or_default())
    }
}

/// Counts of live sessions across all scopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteManagerStats {
    /// Scopes holding any session
    pub total: usize,
    /// Sessions still collecting choices
    pub draft: usize,
    /// Sessions open for voting
    pub open: usize,
}

/// Vote-session command handlers for any number of scopes.
pub struct VoteManager {
    store: Arc<dyn SessionStore>,
    outbound: Arc<dyn Outbound>,
    clock: Arc<dyn Clock>,
    config: VoteConfig,
    locks: Arc<ScopeLocks>,
    countdowns: Arc<CountdownRegistry>,
}

impl VoteManager {
    /// Create a manager over a store and an outbound channel.
    pub fn new(store: Arc<dyn SessionStore>, outbound: Arc<dyn Outbound>, config: VoteConfig) -> Self {
        Self {
            store,
            outbound,
            clock: Arc::new(SystemClock),
            config,
            locks: Arc::new(ScopeLocks::default()),
            countdowns: Arc::new(CountdownRegistry::new()),
        }
    }

    /// Replace the clock (used by tests to drive deadlines).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Parse a raw chat message and dispatch it. Messages that are not vote
    /// commands are ignored.
    pub async fn handle_message(
        &self,
        scope: &str,
        username: &str,
        privileged: bool,
        text: &str,
    ) -> VoteResult<()> {
        match commands::parse(text) {
            Some(command) => self.handle_command(scope, username, privileged, &command).await,
            None => Ok(()),
        }
    }

    /// Dispatch a recognized command to its handler.
    pub async fn handle_command(
        &self,
        scope: &str,
        username: &str,
        privileged: bool,
        command: &VoteCommand,
    ) -> VoteResult<()> {
        match command {
            VoteCommand::Start { question } => {
                self.start_session(scope, username, privileged, question).await
            }
            VoteCommand::AddChoice { choice } => {
                self.add_choice(scope, username, privileged, choice).await
            }
            VoteCommand::SetTimeframe { minutes } => {
                self.set_timeframe(scope, username, privileged, minutes).await
            }
            VoteCommand::Submit => self.submit(scope, username, privileged).await,
            VoteCommand::Cast { choice } => self.cast_vote(scope, username, choice).await,
        }
    }

    /// Start a new draft session. Aborts (without mutating) when one
    /// already exists in this scope.
    pub async fn start_session(
        &self,
        scope: &str,
        username: &str,
        privileged: bool,
        question: &str,
    ) -> VoteResult<()> {
        if !privileged {
            return Ok(());
        }
        let lock = self.locks.for_scope(scope);
        let _guard = lock.lock().await;

        if self.store.load(scope).await?.is_some() {
            self.outbound
                .reply(scope, username, "A vote session is already in progress!")
                .await?;
            return Ok(());
        }

        let session = VoteSession::new(scope, question, self.config.default_timeframe_mins);
        self.store.save(&session).await?;
        info!(scope = %scope, "vote session started");
        self.outbound
            .announce(scope, "Starting new vote session...")
            .await?;
        Ok(())
    }

    /// Append a choice to the draft.
    pub async fn add_choice(
        &self,
        scope: &str,
        username: &str,
        privileged: bool,
        choice: &str,
    ) -> VoteResult<()> {
        if !privileged {
            return Ok(());
        }
        let lock = self.locks.for_scope(scope);
        let _guard = lock.lock().await;

        let Some(mut session) = self.load_draft(scope, username).await? else {
            return Ok(());
        };
        session.add_choice(choice);
        self.store.save(&session).await?;
        self.outbound
            .announce(scope, &format!("Choice: {} added to vote session.", choice))
            .await?;
        Ok(())
    }

    /// Set the voting window on the draft.
    pub async fn set_timeframe(
        &self,
        scope: &str,
        username: &str,
        privileged: bool,
        minutes_text: &str,
    ) -> VoteResult<()> {
        if !privileged {
            return Ok(());
        }
        let lock = self.locks.for_scope(scope);
        let _guard = lock.lock().await;

        let Some(mut session) = self.load_draft(scope, username).await? else {
            return Ok(());
        };
        let Ok(minutes) = minutes_text.trim().parse::<u32>() else {
            self.outbound
                .reply(scope, username, "Invalid timeframe specified.")
                .await?;
            return Ok(());
        };
        session.timeframe = minutes;
        self.store.save(&session).await?;
        self.outbound
            .announce(
                scope,
                &format!("{} minute timeframe set for vote session.", minutes),
            )
            .await?;
        Ok(())
    }

    /// Freeze the draft, open voting, and start the countdown.
    pub async fn submit(&self, scope: &str, username: &str, privileged: bool) -> VoteResult<()> {
        if !privileged {
            return Ok(());
        }
        let lock = self.locks.for_scope(scope);
        let _guard = lock.lock().await;

        let Some(mut session) = self.load_draft(scope, username).await? else {
            return Ok(());
        };
        session.submit(self.clock.now());
        self.store.save(&session).await?;
        info!(scope = %scope, timeframe = session.timeframe, "vote session submitted");
        self.outbound
            .announce(scope, &format_opening(&session))
            .await?;

        start_countdown(
            Arc::clone(&self.countdowns),
            CountdownContext {
                scope: scope.to_string(),
                session_id: session.id.clone(),
                store: Arc::clone(&self.store),
                outbound: Arc::clone(&self.outbound),
                clock: Arc::clone(&self.clock),
                locks: Arc::clone(&self.locks),
                tick_interval: self.config.tick_interval(),
            },
        );
        Ok(())
    }

    /// Cast a vote. Anything invalid is a silent no-op so voting does not
    /// fill the channel with noise.
    pub async fn cast_vote(&self, scope: &str, username: &str, choice_text: &str) -> VoteResult<()> {
        let lock = self.locks.for_scope(scope);
        let _guard = lock.lock().await;

        let Some(mut session) = self.store.load(scope).await? else {
            return Ok(());
        };
        let Ok(index) = choice_text.trim().parse::<usize>() else {
            return Ok(());
        };
        if session.record_vote(index, username) {
            self.store.save(&session).await?;
            debug!(scope = %scope, index = index, "vote recorded");
        }
        Ok(())
    }

    /// Counts of live sessions across all scopes.
    pub async fn stats(&self) -> VoteResult<VoteManagerStats> {
        let mut stats = VoteManagerStats {
            total: 0,
            draft: 0,
            open: 0,
        };
        for scope in self.store.scopes().await? {
            if let Some(session) = self.store.load(&scope).await? {
                stats.total += 1;
                if session.submitted {
                    stats.open += 1;
                } else {
                    stats.draft += 1;
                }
            }
        }
        Ok(stats)
    }

    /// Whether a countdown is running for a scope.
    pub fn countdown_active(&self, scope: &str) -> bool {
        self.countdowns.is_active(scope)
    }

    /// Cancel all countdowns. Sessions stay in the store; a restart may
    /// resume or discard them.
    pub fn shutdown(&self) {
        self.countdowns.cancel_all();
    }

    /// Shared draft precondition: the session must exist and must not be
    /// submitted yet. Replies to the user and returns `None` otherwise.
    async fn load_draft(&self, scope: &str, username: &str) -> VoteResult<Option<VoteSession>> {
        match self.store.load(scope).await? {
            None => {
                self.outbound
                    .reply(scope, username, "A vote session does not exist!")
                    .await?;
                Ok(None)
            }
            Some(session) if session.submitted => {
                self.outbound
                    .reply(scope, username, "The vote session is already submitted!")
                    .await?;
                Ok(None)
            }
            Some(session) => Ok(Some(session)),
        }
    }
}

/// Format the announcement that opens voting: the question, the numbered
/// choices (the placeholder at index 0 is never listed), and instructions.
fn format_opening(session: &VoteSession) -> String {
    let mut output = String::from("Vote session started! Question:\n");
    output.push_str(&session.question);
    output.push_str("\n\nChoices:\n");
    for (index, choice) in session.numbered_choices() {
        output.push_str(&format!("{}: {}\n", index, choice));
    }
    output.push_str("\nUse `!vote {Number} to vote`");
    output
}
