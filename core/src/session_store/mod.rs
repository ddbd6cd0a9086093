//! C6: Session Store.
//!
//! Two ports — a hot cache with TTL and a terminal archive — plus the
//! `SessionStore` facade the Orchestrator actually talks to. Grounded on
//! `chat::session::SessionRegistry` (the in-memory map, TTL-by-touch,
//! JSONL persistence) and `storage_backends::file_archive::FileArchive`
//! (append-only, idempotent-by-key archive).

mod in_memory_cache;
mod jsonl_archive;

pub use in_memory_cache::InMemoryCache;
pub use jsonl_archive::JsonlArchive;

use crate::errors::SessionStoreError;
use crate::types::SessionState;
use async_trait::async_trait;
use std::time::Duration;

/// `get(key) -> bytes | not-found | expired`, `set(key, bytes, ttl)`,
/// `delete(key)`.
#[async_trait]
pub trait SessionCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SessionStoreError>;
    async fn set(&self, key: &str, bytes: Vec<u8>, ttl: Duration) -> Result<(), SessionStoreError>;
    async fn delete(&self, key: &str) -> Result<(), SessionStoreError>;
    async fn is_ready(&self) -> bool;
}

/// `put(key, bytes)` — idempotent by key.
#[async_trait]
pub trait SessionArchive: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), SessionStoreError>;
    async fn is_ready(&self) -> bool;
}

fn cache_key(session_id: &str) -> String {
    format!("session:{session_id}")
}

/// Facade exposing `create`, `get`, `put`, `archive`, `reset` over a
/// cache port + archive port pair.
pub struct SessionStore {
    cache: Box<dyn SessionCache>,
    archive: Box<dyn SessionArchive>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(cache: Box<dyn SessionCache>, archive: Box<dyn SessionArchive>, ttl: Duration) -> Self {
        Self { cache, archive, ttl }
    }

    pub async fn create(&self, state: &SessionState) -> Result<(), SessionStoreError> {
        self.put(state).await
    }

    /// Reads that miss return "session expired" — modeled as `Ok(None)`;
    /// the Orchestrator decides what a missing session means for the turn.
    pub async fn get(&self, session_id: &str) -> Result<Option<SessionState>, SessionStoreError> {
        let bytes = self.cache.get(&cache_key(session_id)).await?;
        match bytes {
            None => Ok(None),
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        }
    }

    /// TTL reset to a fixed duration on every mutation.
    pub async fn put(&self, state: &SessionState) -> Result<(), SessionStoreError> {
        let bytes = serde_json::to_vec(state)?;
        self.cache.set(&cache_key(&state.session_id), bytes, self.ttl).await
    }

    /// Best-effort: a failed archive logs an error but does not fail the
    /// user turn.
    pub async fn archive(&self, state: &SessionState) {
        let bytes = match serde_json::to_vec(state) {
            Ok(b) => b,
            Err(e) => {
                tracing::error!(session_id = %state.session_id, error = %e, "failed to serialize session for archive");
                return;
            }
        };
        if let Err(e) = self.archive.put(&state.session_id, bytes).await {
            tracing::error!(session_id = %state.session_id, error = %e, "best-effort archive write failed");
        }
    }

    pub async fn reset(&self, session_id: &str) -> Result<(), SessionStoreError> {
        self.cache.delete(&cache_key(session_id)).await
    }

    pub async fn cache_ready(&self) -> bool {
        self.cache.is_ready().await
    }

    pub async fn archive_ready(&self) -> bool {
        self.archive.is_ready().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SessionState;

    fn store() -> SessionStore {
        SessionStore::new(
            Box::new(InMemoryCache::new()),
            Box::new(JsonlArchive::in_memory()),
            Duration::from_secs(3600),
        )
    }

    #[tokio::test]
    async fn get_after_put_round_trips() {
        let store = store();
        let state = SessionState::new("sess-1".to_string(), "en".to_string());
        store.put(&state).await.unwrap();
        let loaded = store.get("sess-1").await.unwrap().unwrap();
        assert_eq!(loaded.session_id, "sess-1");
    }

    #[tokio::test]
    async fn missing_session_returns_none() {
        let store = store();
        let loaded = store.get("does-not-exist").await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn reset_then_get_returns_none() {
        let store = store();
        let state = SessionState::new("sess-1".to_string(), "en".to_string());
        store.put(&state).await.unwrap();
        store.reset("sess-1").await.unwrap();
        assert!(store.get("sess-1").await.unwrap().is_none());
    }
}
