//! Countdown Scheduler
//!
//! One cancellable countdown task per scope. Submit starts it; each tick it
//! announces the remaining whole minutes, and once the window elapses it
//! tallies, clears the session, and announces the result. The loop is an
//! explicit repeating task with a cancellation token checked every tick.

use super::clock::Clock;
use super::manager::ScopeLocks;
use super::store::SessionStore;
use super::tally;
use crate::channels::Outbound;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Everything a countdown task needs to run against one scope.
pub(crate) struct CountdownContext {
    pub(crate) scope: String,
    pub(crate) session_id: String,
    pub(crate) store: Arc<dyn SessionStore>,
    pub(crate) outbound: Arc<dyn Outbound>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) locks: Arc<ScopeLocks>,
    pub(crate) tick_interval: Duration,
}

struct CountdownHandle {
    session_id: String,
    token: CancellationToken,
}

/// Tracks the active countdown task per scope. Starting a countdown for a
/// scope cancels whatever was running there before.
#[derive(Default)]
pub struct CountdownRegistry {
    active: Mutex<HashMap<String, CountdownHandle>>,
}

impl CountdownRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a countdown is currently registered for a scope.
    pub fn is_active(&self, scope: &str) -> bool {
        self.active.lock().contains_key(scope)
    }

    /// Cancel every registered countdown (shutdown path).
    pub fn cancel_all(&self) {
        let mut active = self.active.lock();
        for (_, handle) in active.drain() {
            handle.token.cancel();
        }
    }

    fn register(&self, scope: &str, handle: CountdownHandle) {
        let mut active = self.active.lock();
        if let Some(prev) = active.insert(scope.to_string(), handle) {
            prev.token.cancel();
        }
    }

    /// Remove the entry for `scope` only if it still belongs to
    /// `session_id`; a newer countdown may have replaced it already.
    fn deregister(&self, scope: &str, session_id: &str) {
        let mut active = self.active.lock();
        if active
            .get(scope)
            .map(|h| h.session_id == session_id)
            .unwrap_or(false)
        {
            active.remove(scope);
        }
    }
}

/// Spawn the countdown task for a freshly submitted session.
pub(crate) fn start_countdown(registry: Arc<CountdownRegistry>, ctx: CountdownContext) {
    let token = CancellationToken::new();
    registry.register(
        &ctx.scope,
        CountdownHandle {
            session_id: ctx.session_id.clone(),
            token: token.clone(),
        },
    );
    info!(scope = %ctx.scope, "countdown started");
    tokio::spawn(run(ctx, token, registry));
}

async fn run(ctx: CountdownContext, token: CancellationToken, registry: Arc<CountdownRegistry>) {
    loop {
        if tick(&ctx).await {
            break;
        }
        tokio::select! {
            _ = tokio::time::sleep(ctx.tick_interval) => {}
            _ = token.cancelled() => {
                debug!(scope = %ctx.scope, "countdown cancelled");
                break;
            }
        }
    }
    registry.deregister(&ctx.scope, &ctx.session_id);
}

/// One countdown tick. Returns true when the task should terminate.
async fn tick(ctx: &CountdownContext) -> bool {
    let lock = ctx.locks.for_scope(&ctx.scope);
    let _guard = lock.lock().await;

    let session = match ctx.store.load(&ctx.scope).await {
        Ok(Some(session)) => session,
        Ok(None) => {
            debug!(scope = %ctx.scope, "session gone, stopping countdown");
            return true;
        }
        Err(e) => {
            // Transient store trouble; retry on the next tick.
            warn!(scope = %ctx.scope, error = %e, "countdown failed to load session");
            return false;
        }
    };
    if session.id != ctx.session_id {
        debug!(scope = %ctx.scope, "session replaced, stopping countdown");
        return true;
    }

    let remaining = session.remaining_minutes(ctx.clock.now());
    if remaining > 0 {
        let text = format!("{} minutes in current vote session.", remaining);
        if let Err(e) = ctx.outbound.announce(&ctx.scope, &text).await {
            warn!(scope = %ctx.scope, error = %e, "countdown announce failed");
        }
        return false;
    }

    // Window elapsed: tally, clear, announce, done.
    let outcome = tally::tally(&session);
    if let Err(e) = ctx.store.clear(&ctx.scope).await {
        warn!(scope = %ctx.scope, error = %e, "failed to clear finished session");
    }
    if let Err(e) = ctx
        .outbound
        .announce(&ctx.scope, &outcome.announcement())
        .await
    {
        warn!(scope = %ctx.scope, error = %e, "failed to announce result");
    }
    info!(scope = %ctx.scope, "vote session closed");
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::{ChannelResult, Outbound};
    use crate::vote::session::VoteSession;
    use crate::vote::store::MemorySessionStore;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};

    #[derive(Default)]
    struct RecordingChannel {
        messages: Mutex<Vec<String>>,
    }

    impl RecordingChannel {
        fn messages(&self) -> Vec<String> {
            self.messages.lock().clone()
        }
    }

    #[async_trait]
    impl Outbound for RecordingChannel {
        async fn announce(&self, _scope: &str, text: &str) -> ChannelResult<()> {
            self.messages.lock().push(text.to_string());
            Ok(())
        }

        async fn reply(&self, _scope: &str, username: &str, text: &str) -> ChannelResult<()> {
            self.messages.lock().push(format!("@{}: {}", username, text));
            Ok(())
        }
    }

    /// Maps tokio's (pausable) clock onto wall-clock time.
    struct SimClock {
        base: DateTime<Utc>,
        start: tokio::time::Instant,
    }

    impl SimClock {
        fn new(base: DateTime<Utc>) -> Self {
            Self {
                base,
                start: tokio::time::Instant::now(),
            }
        }
    }

    impl Clock for SimClock {
        fn now(&self) -> DateTime<Utc> {
            let elapsed = self.start.elapsed();
            self.base + chrono::Duration::from_std(elapsed).unwrap_or_default()
        }
    }

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn context(
        session_id: &str,
        store: Arc<MemorySessionStore>,
        channel: Arc<RecordingChannel>,
        clock: Arc<dyn Clock>,
    ) -> CountdownContext {
        CountdownContext {
            scope: "room".to_string(),
            session_id: session_id.to_string(),
            store,
            outbound: channel,
            clock,
            locks: Arc::new(ScopeLocks::default()),
            tick_interval: Duration::from_secs(60),
        }
    }

    async fn wait_until_inactive(registry: &CountdownRegistry, scope: &str) {
        for _ in 0..600 {
            if !registry.is_active(scope) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        panic!("countdown never terminated");
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_runs_to_completion() {
        let store = Arc::new(MemorySessionStore::new());
        let channel = Arc::new(RecordingChannel::default());
        let clock = Arc::new(SimClock::new(base_time()));
        let registry = Arc::new(CountdownRegistry::new());

        let mut session = VoteSession::new("room", "Pizza?", 1);
        session.add_choice("Yes");
        session.submit(clock.now());
        session.record_vote(1, "alice");
        let id = session.id.clone();
        store.save(&session).await.unwrap();

        start_countdown(
            Arc::clone(&registry),
            context(&id, Arc::clone(&store), Arc::clone(&channel), clock),
        );
        wait_until_inactive(&registry, "room").await;

        let messages = channel.messages();
        assert_eq!(messages[0], "2 minutes in current vote session.");
        assert_eq!(messages[1], "1 minutes in current vote session.");
        assert_eq!(
            messages.last().unwrap(),
            "Vote is over! 'Yes' wins with 1 vote"
        );
        assert_eq!(store.load("room").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_stops_when_session_cleared() {
        let store = Arc::new(MemorySessionStore::new());
        let channel = Arc::new(RecordingChannel::default());
        let clock = Arc::new(SimClock::new(base_time()));
        let registry = Arc::new(CountdownRegistry::new());

        let mut session = VoteSession::new("room", "Pizza?", 5);
        session.add_choice("Yes");
        session.submit(clock.now());
        let id = session.id.clone();
        store.save(&session).await.unwrap();

        start_countdown(
            Arc::clone(&registry),
            context(&id, Arc::clone(&store), Arc::clone(&channel), clock),
        );
        // Let the first tick land, then yank the session out from under it.
        tokio::time::sleep(Duration::from_secs(1)).await;
        store.clear("room").await.unwrap();

        wait_until_inactive(&registry, "room").await;
        let messages = channel.messages();
        assert!(messages.iter().all(|m| !m.starts_with("Vote is over!")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_stops_when_session_replaced() {
        let store = Arc::new(MemorySessionStore::new());
        let channel = Arc::new(RecordingChannel::default());
        let clock = Arc::new(SimClock::new(base_time()));
        let registry = Arc::new(CountdownRegistry::new());

        let mut session = VoteSession::new("room", "Pizza?", 5);
        session.add_choice("Yes");
        session.submit(clock.now());
        store.save(&session).await.unwrap();

        // Countdown bound to a different session identity.
        start_countdown(
            Arc::clone(&registry),
            context(
                "some-other-session",
                Arc::clone(&store),
                Arc::clone(&channel),
                clock,
            ),
        );
        wait_until_inactive(&registry, "room").await;

        assert!(channel.messages().is_empty());
        assert!(store.load("room").await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_stops_ticking() {
        let store = Arc::new(MemorySessionStore::new());
        let channel = Arc::new(RecordingChannel::default());
        let clock = Arc::new(SimClock::new(base_time()));
        let registry = Arc::new(CountdownRegistry::new());

        let mut session = VoteSession::new("room", "Pizza?", 5);
        session.add_choice("Yes");
        session.submit(clock.now());
        let id = session.id.clone();
        store.save(&session).await.unwrap();

        start_countdown(
            Arc::clone(&registry),
            context(&id, Arc::clone(&store), Arc::clone(&channel), clock),
        );
        tokio::time::sleep(Duration::from_secs(1)).await;
        registry.cancel_all();
        assert!(!registry.is_active("room"));

        let before = channel.messages().len();
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(channel.messages().len(), before);
    }
}
