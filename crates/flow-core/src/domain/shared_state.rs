//! Shared state container for Flow runs
//!
//! One container exists per top-level run. Every Fork and Race branch spawned
//! from that run holds a clone of the same handle, so mutations made by any
//! task are visible to all of them. Each mutation is a single lock-guarded
//! update and each read clones a snapshot, so no task ever observes a
//! half-applied write.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::trace;

use crate::types::ForeignState;

/// The two mappings held by the container
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateMaps {
    /// String-valued named state (the ephemeral store)
    pub named: HashMap<String, String>,

    /// Opaque-valued foreign state
    pub foreign: ForeignState,
}

/// Synchronized named/foreign state shared by a run and its forks
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    inner: Arc<RwLock<StateMaps>>,
}

impl SharedState {
    /// Create an empty container
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a container seeded with the given mappings
    pub fn from_maps(maps: StateMaps) -> Self {
        Self {
            inner: Arc::new(RwLock::new(maps)),
        }
    }

    /// Snapshot of the named state
    pub async fn read_named(&self) -> HashMap<String, String> {
        self.inner.read().await.named.clone()
    }

    /// Look up a single named key
    pub async fn get_named(&self, key: &str) -> Option<String> {
        self.inner.read().await.named.get(key).cloned()
    }

    /// Insert or overwrite a named key
    pub async fn update_named(&self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let mut state = self.inner.write().await;
        trace!(key = %key, "Updating named state");
        state.named.insert(key, value.into());
    }

    /// Remove a named key if present, returning the old value
    pub async fn delete_named(&self, key: &str) -> Option<String> {
        let mut state = self.inner.write().await;
        trace!(key = %key, "Deleting named state");
        state.named.remove(key)
    }

    /// Snapshot of the whole foreign state
    pub async fn read_foreign_all(&self) -> ForeignState {
        self.inner.read().await.foreign.clone()
    }

    /// Insert or overwrite a foreign key
    pub async fn write_foreign(&self, key: impl Into<String>, value: Value) {
        let key = key.into();
        let mut state = self.inner.write().await;
        trace!(key = %key, "Updating foreign state");
        state.foreign.insert(key, value);
    }

    /// Snapshot of both mappings
    pub async fn snapshot(&self) -> StateMaps {
        self.inner.read().await.clone()
    }

    /// Whether two handles point at the same container
    pub fn same_container(&self, other: &SharedState) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_named_update_and_delete() {
        let state = SharedState::new();
        assert_eq!(state.get_named("token").await, None);

        state.update_named("token", "abc").await;
        state.update_named("token", "def").await;
        assert_eq!(state.get_named("token").await, Some("def".to_string()));

        assert_eq!(state.delete_named("token").await, Some("def".to_string()));
        assert_eq!(state.delete_named("token").await, None);
        assert!(state.read_named().await.is_empty());
    }

    #[tokio::test]
    async fn test_foreign_state_accumulates() {
        let state = SharedState::new();
        state.write_foreign("user", json!({"id": 1})).await;
        state.write_foreign("cart", json!([1, 2])).await;
        state.write_foreign("user", json!({"id": 2})).await;

        let foreign = state.read_foreign_all().await;
        assert_eq!(foreign.len(), 2);
        assert_eq!(foreign["user"], json!({"id": 2}));
        assert_eq!(foreign["cart"], json!([1, 2]));
    }

    #[tokio::test]
    async fn test_snapshot_is_detached() {
        let state = SharedState::new();
        state.update_named("a", "1").await;

        let before = state.read_named().await;
        state.update_named("b", "2").await;

        assert_eq!(before.len(), 1);
        assert_eq!(state.read_named().await.len(), 2);
    }

    #[tokio::test]
    async fn test_clones_share_one_container() {
        let state = SharedState::new();
        let other = state.clone();
        other.update_named("k", "v").await;

        assert!(state.same_container(&other));
        assert!(!state.same_container(&SharedState::new()));
        assert_eq!(state.get_named("k").await, Some("v".to_string()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_do_not_lose_keys() {
        let state = SharedState::new();
        let mut tasks = Vec::new();
        for worker in 0..8 {
            let state = state.clone();
            tasks.push(tokio::spawn(async move {
                for i in 0..50 {
                    state
                        .update_named(format!("{worker}-{i}"), i.to_string())
                        .await;
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(state.read_named().await.len(), 400);
    }

    #[tokio::test]
    async fn test_from_maps_seeds_state() {
        let mut maps = StateMaps::default();
        maps.foreign.insert("config".into(), json!({"env": "test"}));
        let state = SharedState::from_maps(maps.clone());

        assert_eq!(state.snapshot().await, maps);
    }
}
