//! Progress persistence boundary.
//!
//! The navigator never serializes anything itself. Hosts plug a
//! [`ProgressStore`] into a [`FlowSession`](crate::session::FlowSession), which
//! hands it snapshots after forward moves.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::navigator::FlowSnapshot;

/// Key prefix used for saved onboarding progress.
pub const PROGRESS_KEY_PREFIX: &str = "onboarding_flow";

/// Build the storage key for a user's saved progress.
pub fn progress_key(user_id: &str) -> String {
    format!("{PROGRESS_KEY_PREFIX}:{user_id}")
}

/// Backend-agnostic store for saved flow progress.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Save (or overwrite) the snapshot under `key`.
    async fn save_progress(&self, key: &str, snapshot: &FlowSnapshot) -> Result<(), StoreError>;

    /// Load the snapshot under `key`, if any.
    async fn load_progress(&self, key: &str) -> Result<Option<FlowSnapshot>, StoreError>;

    /// Remove the snapshot under `key`. Missing keys are not an error.
    async fn delete_progress(&self, key: &str) -> Result<(), StoreError>;
}

/// In-process store holding snapshots as JSON values.
#[derive(Debug, Default)]
pub struct MemoryProgressStore {
    entries: RwLock<HashMap<String, serde_json::Value>>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl ProgressStore for MemoryProgressStore {
    async fn save_progress(&self, key: &str, snapshot: &FlowSnapshot) -> Result<(), StoreError> {
        let value = serde_json::to_value(snapshot)?;
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn load_progress(&self, key: &str) -> Result<Option<FlowSnapshot>, StoreError> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    async fn delete_progress(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigator::FlowState;

    #[tokio::test]
    async fn memory_store_save_load_delete() {
        let store = MemoryProgressStore::new();
        let key = progress_key("default");
        assert_eq!(key, "onboarding_flow:default");
        assert!(store.load_progress(&key).await.unwrap().is_none());

        let mut state = FlowState::new("s1");
        state.current_step_index = 1;
        let snapshot = FlowSnapshot {
            state,
            history: vec![],
        };
        store.save_progress(&key, &snapshot).await.unwrap();
        assert_eq!(store.len().await, 1);
        assert_eq!(store.load_progress(&key).await.unwrap(), Some(snapshot));

        store.delete_progress(&key).await.unwrap();
        store.delete_progress(&key).await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn corrupt_entry_is_a_serialization_error() {
        let store = MemoryProgressStore::new();
        store
            .entries
            .write()
            .await
            .insert("k".into(), serde_json::json!({"state": 42}));
        assert!(matches!(
            store.load_progress("k").await,
            Err(StoreError::Serialization(_))
        ));
    }
}
