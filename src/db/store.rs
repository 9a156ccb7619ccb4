use crate::error::AppResult;

/// Durable string-keyed storage backing the dataset caches
///
/// Multi-key writes and removals must be applied atomically: a reader never
/// observes half of a `set_many` or `remove_many`.
#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads a single key
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Writes every entry in one atomic operation
    async fn set_many(&self, entries: Vec<(String, String)>) -> AppResult<()>;

    /// Removes every key in one atomic operation; missing keys are ignored
    async fn remove_many(&self, keys: Vec<String>) -> AppResult<()>;

    /// Backend name for logging and debugging
    fn name(&self) -> &'static str;
}
