//! Append-only record sink for chat exchanges

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};

use crate::types::{ChatExchange, StoreError};

#[async_trait]
pub trait InteractionLog: Send + Sync {
    async fn insert(&self, record: ChatExchange) -> Result<(), StoreError>;

    /// Up to `limit` most recent records for a session, oldest first.
    async fn recent(&self, session_id: &str, limit: usize) -> Result<Vec<ChatExchange>, StoreError>;
}

fn tail_for_session<I>(records: I, session_id: &str, limit: usize) -> Vec<ChatExchange>
where
    I: DoubleEndedIterator<Item = ChatExchange>,
{
    let mut picked: Vec<ChatExchange> = records
        .rev()
        .filter(|r| r.session_id == session_id)
        .take(limit)
        .collect();
    picked.reverse();
    picked
}

/// In-memory log for tests and local development.
#[derive(Default)]
pub struct MemoryInteractionLog {
    records: RwLock<Vec<ChatExchange>>,
}

impl MemoryInteractionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<ChatExchange> {
        self.records.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl InteractionLog for MemoryInteractionLog {
    async fn insert(&self, record: ChatExchange) -> Result<(), StoreError> {
        self.records.write().await.push(record);
        Ok(())
    }

    async fn recent(&self, session_id: &str, limit: usize) -> Result<Vec<ChatExchange>, StoreError> {
        let records = self.records.read().await;
        Ok(tail_for_session(records.iter().cloned(), session_id, limit))
    }
}

/// JSON-lines file log: one serialized [`ChatExchange`] per line.
///
/// Meant for development and single-node deployments. `recent` rescans the
/// whole file on every call, so its cost grows with the log; a deployment
/// with a long history should put a document store behind
/// [`InteractionLog`] instead, or set `HISTORY_LIMIT=0`.
pub struct JsonlInteractionLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlInteractionLog {
    /// Open (creating parent directories) without truncating existing records.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        tracing::info!("📝 Interaction log at {}", path.display());
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl InteractionLog for JsonlInteractionLog {
    async fn insert(&self, record: ChatExchange) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }

    async fn recent(&self, session_id: &str, limit: usize) -> Result<Vec<ChatExchange>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let content = tokio::fs::read_to_string(&self.path).await?;
        let records: Vec<ChatExchange> = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str(line) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable interaction log line");
                    None
                }
            })
            .collect();
        Ok(tail_for_session(records.into_iter(), session_id, limit))
    }
}
