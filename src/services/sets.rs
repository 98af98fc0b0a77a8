//! Per-session fact lists over a shared multi-value store
//!
//! Every value is stored as `"{session_id}:{value}"` in the collection named
//! by the caller. Session ids never contain the separator, so the first `:`
//! always ends the tag and values may contain it freely.

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::types::{StoreError, ValidationError};

pub const TAG_SEPARATOR: char = ':';

/// Backing multi-value store (Redis-style sets).
#[async_trait]
pub trait SetBackend: Send + Sync {
    /// Add a member; returns `false` if it was already present.
    async fn add(&self, collection: &str, member: &str) -> Result<bool, StoreError>;

    async fn members(&self, collection: &str) -> Result<Vec<String>, StoreError>;
}

/// In-process set backend.
#[derive(Default)]
pub struct MemorySetBackend {
    sets: RwLock<HashMap<String, BTreeSet<String>>>,
}

impl MemorySetBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SetBackend for MemorySetBackend {
    async fn add(&self, collection: &str, member: &str) -> Result<bool, StoreError> {
        let mut sets = self.sets.write().await;
        Ok(sets
            .entry(collection.to_string())
            .or_default()
            .insert(member.to_string()))
    }

    async fn members(&self, collection: &str) -> Result<Vec<String>, StoreError> {
        let sets = self.sets.read().await;
        Ok(sets
            .get(collection)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SetStoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct KeyedSetStore {
    backend: Arc<dyn SetBackend>,
}

impl KeyedSetStore {
    pub fn new(backend: Arc<dyn SetBackend>) -> Self {
        Self { backend }
    }

    pub async fn add(
        &self,
        session_id: &str,
        set_name: &str,
        value: &str,
    ) -> Result<(), SetStoreError> {
        validate(session_id, set_name)?;
        if value.is_empty() {
            return Err(ValidationError::MissingValue.into());
        }

        let tagged = format!("{session_id}{TAG_SEPARATOR}{value}");
        let inserted = self.backend.add(set_name, &tagged).await?;
        tracing::debug!(set_name, inserted, "set entry added");
        Ok(())
    }

    /// Values tagged with `session_id`, tag stripped, in backend order.
    pub async fn list(&self, session_id: &str, set_name: &str) -> Result<Vec<String>, SetStoreError> {
        validate(session_id, set_name)?;

        let prefix = format!("{session_id}{TAG_SEPARATOR}");
        let members = self.backend.members(set_name).await?;
        Ok(members
            .into_iter()
            .filter_map(|member| member.strip_prefix(&prefix).map(str::to_string))
            .collect())
    }
}

fn validate(session_id: &str, set_name: &str) -> Result<(), ValidationError> {
    if session_id.contains(TAG_SEPARATOR) {
        return Err(ValidationError::InvalidSessionId(TAG_SEPARATOR));
    }
    if set_name.is_empty() {
        return Err(ValidationError::MissingSetName);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> KeyedSetStore {
        KeyedSetStore::new(Arc::new(MemorySetBackend::new()))
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = store();
        store.add("alice", "allergies", "peanuts").await.unwrap();
        store.add("bob", "allergies", "gluten").await.unwrap();
        store.add("alice", "allergies", "shellfish").await.unwrap();
        store.add("bob", "goals", "run 5k").await.unwrap();

        let mut alice = store.list("alice", "allergies").await.unwrap();
        alice.sort();
        assert_eq!(alice, vec!["peanuts", "shellfish"]);
        assert_eq!(store.list("bob", "allergies").await.unwrap(), vec!["gluten"]);
        assert!(store.list("alice", "goals").await.unwrap().is_empty());
        assert!(store.list("carol", "allergies").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_prefix_sessions_do_not_leak() {
        let store = store();
        store.add("abcd", "notes", "mine").await.unwrap();
        assert!(store.list("abc", "notes").await.unwrap().is_empty());
        assert!(store.list("abcd:", "notes").await.is_err());
    }

    #[tokio::test]
    async fn test_duplicates_collapse() {
        let store = store();
        store.add("s1", "foods", "kale").await.unwrap();
        store.add("s1", "foods", "kale").await.unwrap();
        assert_eq!(store.list("s1", "foods").await.unwrap(), vec!["kale"]);
    }

    #[tokio::test]
    async fn test_value_with_separator_round_trips() {
        let store = store();
        store.add("s1", "times", "breakfast: 07:30").await.unwrap();
        assert_eq!(
            store.list("s1", "times").await.unwrap(),
            vec!["breakfast: 07:30"]
        );
    }

    #[tokio::test]
    async fn test_validation() {
        let store = store();
        assert!(matches!(
            store.add("s1", "", "x").await,
            Err(SetStoreError::Validation(ValidationError::MissingSetName))
        ));
        assert!(matches!(
            store.add("s1", "foods", "").await,
            Err(SetStoreError::Validation(ValidationError::MissingValue))
        ));
        assert!(matches!(
            store.add("s:1", "foods", "x").await,
            Err(SetStoreError::Validation(ValidationError::InvalidSessionId(':')))
        ));
        assert!(store.list("s1", "foods").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_adds_from_many_sessions() {
        let store = Arc::new(store());
        let mut handles = Vec::new();
        for session in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let id = format!("session-{session}");
                for n in 0..10 {
                    store.add(&id, "shared", &format!("v{n}")).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        for session in 0..8 {
            let values = store.list(&format!("session-{session}"), "shared").await.unwrap();
            assert_eq!(values.len(), 10);
        }
    }
}
