//! Append-only archive, following `storage_backends::file_archive::FileArchive`
//! and `chat::session::SessionRegistry::append_session_to_disk`: one JSON
//! object per line, idempotent by key (re-archiving the same id just appends
//! another line; readers take the last line for that id).

use super::SessionArchive;
use crate::errors::SessionStoreError;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

enum Backend {
    File(PathBuf),
    /// In-memory backend for tests — avoids touching the filesystem.
    Memory(Arc<Mutex<Vec<(String, Vec<u8>)>>>),
}

pub struct JsonlArchive {
    backend: Backend,
}

impl JsonlArchive {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: Backend::File(path.into()),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(Arc::new(Mutex::new(Vec::new()))),
        }
    }

    /// Test/inspection helper: entries archived so far, in write order.
    pub async fn entries(&self) -> Vec<(String, Vec<u8>)> {
        match &self.backend {
            Backend::Memory(entries) => entries.lock().await.clone(),
            Backend::File(_) => Vec::new(),
        }
    }
}

#[async_trait]
impl SessionArchive for JsonlArchive {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), SessionStoreError> {
        match &self.backend {
            Backend::Memory(entries) => {
                entries.lock().await.push((key.to_string(), bytes));
                Ok(())
            }
            Backend::File(path) => {
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|e| SessionStoreError::ArchiveTransport(e.to_string()))?;
                }
                let mut line = serde_json::json!({ "key": key, "snapshot": serde_json::from_slice::<serde_json::Value>(&bytes).unwrap_or(serde_json::Value::Null) })
                    .to_string();
                line.push('\n');
                let mut file = tokio::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .await
                    .map_err(|e| SessionStoreError::ArchiveTransport(e.to_string()))?;
                file.write_all(line.as_bytes())
                    .await
                    .map_err(|e| SessionStoreError::ArchiveTransport(e.to_string()))?;
                Ok(())
            }
        }
    }

    async fn is_ready(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_backend_records_every_put() {
        let archive = JsonlArchive::in_memory();
        archive.put("s1", b"{}".to_vec()).await.unwrap();
        archive.put("s1", b"{}".to_vec()).await.unwrap();
        assert_eq!(archive.entries().await.len(), 2);
    }
}
