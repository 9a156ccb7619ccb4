use std::{fmt::Display, sync::Arc};

use crate::{
    db::KeyValueStore,
    error::AppResult,
    models::{Dataset, Movie},
};

/// Datasets older than this since their last successful fetch are stale
pub const STALE_AFTER_MS: i64 = 24 * 60 * 60 * 1000;

/// Staleness check; exactly `STALE_AFTER_MS` old is still fresh
pub fn is_stale(fetched_at: i64, now: i64) -> bool {
    now - fetched_at > STALE_AFTER_MS
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Movies(Dataset),
    FetchedAt(Dataset),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Movies(dataset) => write!(f, "movies:{}", dataset),
            CacheKey::FetchedAt(dataset) => write!(f, "fetched_at:{}", dataset),
        }
    }
}

/// Persisted contents of one dataset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CachedDataset {
    pub movies: Vec<Movie>,
    /// Epoch milliseconds of the last successful fetch, 0 if never
    pub fetched_at: i64,
}

impl CachedDataset {
    pub fn is_stale(&self, now: i64) -> bool {
        is_stale(self.fetched_at, now)
    }
}

/// Per-dataset durable cache of {movies, last-fetch timestamp}
#[derive(Clone)]
pub struct CacheStore {
    store: Arc<dyn KeyValueStore>,
    namespace: String,
}

impl CacheStore {
    pub fn new(store: Arc<dyn KeyValueStore>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    fn key(&self, key: CacheKey) -> String {
        format!("{}:{}", self.namespace, key)
    }

    /// Loads a dataset, treating missing or corrupt entries as empty
    ///
    /// Corrupt entries are deleted so the next successful fetch starts clean.
    pub async fn load(&self, dataset: Dataset) -> AppResult<CachedDataset> {
        let movies_key = self.key(CacheKey::Movies(dataset));
        let fetched_at_key = self.key(CacheKey::FetchedAt(dataset));

        let movies = match self.store.get(&movies_key).await? {
            Some(json) => match serde_json::from_str::<Vec<Movie>>(&json) {
                Ok(movies) => movies,
                Err(e) => {
                    tracing::warn!(
                        dataset = %dataset,
                        error = %e,
                        "Cache corruption detected, discarding cached movies"
                    );
                    self.store.remove_many(vec![movies_key]).await?;
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        let fetched_at = match self.store.get(&fetched_at_key).await? {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(ts) => ts,
                Err(e) => {
                    tracing::warn!(
                        dataset = %dataset,
                        value = %raw,
                        error = %e,
                        "Invalid cached timestamp, discarding"
                    );
                    self.store.remove_many(vec![fetched_at_key]).await?;
                    0
                }
            },
            None => 0,
        };

        tracing::debug!(
            dataset = %dataset,
            movies = movies.len(),
            fetched_at,
            backend = self.store.name(),
            "Loaded cached dataset"
        );

        Ok(CachedDataset { movies, fetched_at })
    }

    /// Replaces a dataset's movies and timestamp together
    pub async fn put(&self, dataset: Dataset, movies: &[Movie], fetched_at: i64) -> AppResult<()> {
        let json = serde_json::to_string(movies)?;
        self.store
            .set_many(vec![
                (self.key(CacheKey::Movies(dataset)), json),
                (self.key(CacheKey::FetchedAt(dataset)), fetched_at.to_string()),
            ])
            .await?;

        tracing::debug!(dataset = %dataset, movies = movies.len(), fetched_at, "Cached dataset");
        Ok(())
    }

    /// Replaces only the movie list, leaving the timestamp alone
    pub async fn put_movies(&self, dataset: Dataset, movies: &[Movie]) -> AppResult<()> {
        let json = serde_json::to_string(movies)?;
        self.store
            .set_many(vec![(self.key(CacheKey::Movies(dataset)), json)])
            .await
    }

    /// Removes both the movies and the timestamp of a dataset
    pub async fn clear(&self, dataset: Dataset) -> AppResult<()> {
        self.store
            .remove_many(vec![
                self.key(CacheKey::Movies(dataset)),
                self.key(CacheKey::FetchedAt(dataset)),
            ])
            .await?;

        tracing::info!(dataset = %dataset, "Cleared cached dataset");
        Ok(())
    }
}
