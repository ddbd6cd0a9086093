//! In-memory hot cache, following `chat::session::SessionRegistry`'s
//! `Arc<RwLock<HashMap<..>>>` and lazy-expiry-on-read style.

use super::SessionCache;
use crate::errors::SessionStoreError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Default)]
pub struct InMemoryCache {
    entries: Arc<RwLock<HashMap<String, (Vec<u8>, Instant)>>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionCache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SessionStoreError> {
        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some((bytes, expires_at)) if *expires_at > Instant::now() => Ok(Some(bytes.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, bytes: Vec<u8>, ttl: Duration) -> Result<(), SessionStoreError> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), (bytes, Instant::now() + ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), SessionStoreError> {
        let mut entries = self.entries.write().await;
        entries.remove(key);
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        true
    }
}
