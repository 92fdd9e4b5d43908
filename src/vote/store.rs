//! Session Store
//!
//! Get/set-by-scope persistence with last-writer-wins semantics. The vote
//! machinery only needs load/save/clear for a single scope key; anything
//! with those semantics (a bot's brain, Redis, a file tree) can sit behind
//! the trait.

use super::session::VoteSession;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in session persistence
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Keyed session persistence, last writer wins.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the session for a scope, if any.
    async fn load(&self, scope: &str) -> StoreResult<Option<VoteSession>>;

    /// Save (insert or overwrite) the session for its scope.
    async fn save(&self, session: &VoteSession) -> StoreResult<()>;

    /// Remove the session for a scope. Clearing a missing scope is fine.
    async fn clear(&self, scope: &str) -> StoreResult<()>;

    /// Scope keys that currently hold a session.
    async fn scopes(&self) -> StoreResult<Vec<String>>;
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, VoteSession>>,
}

impl MemorySessionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, scope: &str) -> StoreResult<Option<VoteSession>> {
        Ok(self.sessions.read().get(scope).cloned())
    }

    async fn save(&self, session: &VoteSession) -> StoreResult<()> {
        self.sessions
            .write()
            .insert(session.scope.clone(), session.clone());
        Ok(())
    }

    async fn clear(&self, scope: &str) -> StoreResult<()> {
        self.sessions.write().remove(scope);
        Ok(())
    }

    async fn scopes(&self) -> StoreResult<Vec<String>> {
        Ok(self.sessions.read().keys().cloned().collect())
    }
}

/// File-backed store: one JSON document per scope under a base directory.
#[derive(Debug)]
pub struct FileSessionStore {
    base_path: PathBuf,
}

impl FileSessionStore {
    /// Create a store rooted at `base_path`, creating the directory if
    /// needed.
    pub fn new(base_path: impl Into<PathBuf>) -> StoreResult<Self> {
        let base_path = base_path.into();
        std::fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    /// Scope keys may contain path separators; keep filenames flat.
    fn path_for(&self, scope: &str) -> PathBuf {
        let safe: String = scope
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.base_path.join(format!("{}.json", safe))
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self, scope: &str) -> StoreResult<Option<VoteSession>> {
        match std::fs::read_to_string(self.path_for(scope)) {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, session: &VoteSession) -> StoreResult<()> {
        let path = self.path_for(&session.scope);
        let raw = serde_json::to_string_pretty(session)?;
        // Write to temp, then rename.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, raw)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    async fn clear(&self, scope: &str) -> StoreResult<()> {
        match std::fs::remove_file(self.path_for(scope)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn scopes(&self) -> StoreResult<Vec<String>> {
        let mut out = Vec::new();
        for entry in std::fs::read_dir(&self.base_path)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    out.push(stem.to_string());
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_round_trip() {
        let store = MemorySessionStore::new();
        let session = VoteSession::new("room-1", "Pizza?", 3);

        store.save(&session).await.unwrap();
        let loaded = store.load("room-1").await.unwrap();
        assert_eq!(loaded, Some(session));

        assert_eq!(store.load("room-2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_last_writer_wins() {
        let store = MemorySessionStore::new();
        let first = VoteSession::new("room-1", "Pizza?", 3);
        let second = VoteSession::new("room-1", "Tacos?", 3);

        store.save(&first).await.unwrap();
        store.save(&second).await.unwrap();

        let loaded = store.load("room-1").await.unwrap().unwrap();
        assert_eq!(loaded.question, "Tacos?");
    }

    #[tokio::test]
    async fn test_memory_clear_is_idempotent() {
        let store = MemorySessionStore::new();
        let session = VoteSession::new("room-1", "Pizza?", 3);

        store.save(&session).await.unwrap();
        store.clear("room-1").await.unwrap();
        store.clear("room-1").await.unwrap();
        assert_eq!(store.load("room-1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(tmp.path().join("sessions")).unwrap();

        let mut session = VoteSession::new("room-1", "Pizza?", 3);
        session.add_choice("Yes");
        store.save(&session).await.unwrap();

        let loaded = store.load("room-1").await.unwrap();
        assert_eq!(loaded, Some(session));

        store.clear("room-1").await.unwrap();
        assert_eq!(store.load("room-1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_scope_names_are_sanitized() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(tmp.path()).unwrap();

        let session = VoteSession::new("room/with:odd chars", "Pizza?", 3);
        store.save(&session).await.unwrap();

        let loaded = store.load("room/with:odd chars").await.unwrap();
        assert!(loaded.is_some());
        assert_eq!(store.scopes().await.unwrap().len(), 1);
    }
}
