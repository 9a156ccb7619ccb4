use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::{db::KeyValueStore, error::AppResult};

/// In-process store; one lock guards the whole map so batch operations are atomic
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set_many(&self, entries: Vec<(String, String)>) -> AppResult<()> {
        let mut map = self.entries.write().await;
        map.extend(entries);
        Ok(())
    }

    async fn remove_many(&self, keys: Vec<String>) -> AppResult<()> {
        let mut map = self.entries.write().await;
        for key in keys {
            map.remove(&key);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
