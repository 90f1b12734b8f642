//! In-memory implementation of the PersistentStore interface

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use flow_core::{FlowError, PersistentStore};

/// In-memory implementation of PersistentStore
///
/// Clones share the same map, so a store handed to a runner can still be
/// inspected by the host afterwards.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPersistentStore {
    /// Map of key -> value
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryPersistentStore {
    /// Create an empty store
    pub fn new() -> Self {
        debug!("Creating new InMemoryPersistentStore");
        Self::default()
    }

    /// Create a store pre-populated with the given entries
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            entries: Arc::new(RwLock::new(entries)),
        }
    }

    /// Copy of every stored entry
    pub async fn entries(&self) -> HashMap<String, String> {
        self.entries.read().await.clone()
    }

    /// Number of stored keys
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the store is empty
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl PersistentStore for InMemoryPersistentStore {
    async fn get(&self, key: &str) -> Result<Option<String>, FlowError> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), FlowError> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), value.to_string());
        debug!("Set persistent value for key={}", key);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), FlowError> {
        let mut entries = self.entries.write().await;
        if entries.remove(key).is_some() {
            debug!("Deleted persistent value for key={}", key);
        }
        Ok(())
    }
}
