/// Refresh controller
///
/// Owns the in-memory state of the three datasets and decides when each one
/// is fetched. Every dataset runs its own `Idle -> Loading -> {Success, Error}`
/// state machine; the Loading check-and-set happens under the dataset's lock,
/// so at most one fetch per dataset is ever in flight. The lock is released
/// for the upstream call and re-taken to commit.
///
/// A fetch runs on its own task once `Loading` is set, so dropping the
/// caller (a disconnected HTTP client) never leaves a dataset stuck loading.
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};

use crate::{
    db::{is_stale, CacheStore},
    error::{AppError, AppResult},
    models::{
        Dataset, DatasetSnapshot, EmailDraft, GroundingReference, LoadingStatus, Movie,
        Notification,
    },
    services::{
        email,
        generation::GenerationResponse,
        merge::{self, ContainmentMatcher, MatchPolicy, TitleMatcher},
        parser,
        prompts::PromptBuilder,
        retry::GenerationClient,
    },
};

const NOTIFICATION_CHANNEL_CAPACITY: usize = 16;

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Why a refresh request did not reach the upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// A fetch for this dataset is already in flight
    AlreadyLoading,
    /// Watchlist checks need at least one entry
    EmptyWatchlist,
    /// Activation found the dataset fresh enough
    NotDue,
}

/// Result of a refresh or activation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum RefreshOutcome {
    Refreshed {
        movies: usize,
        /// The response was malformed and the result is an empty fallback
        suspect: bool,
        newly_available: usize,
    },
    Skipped {
        reason: SkipReason,
    },
    Failed {
        error: String,
    },
    /// The cache was cleared while the fetch was in flight; result dropped
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleOutcome {
    Added,
    Removed,
}

#[derive(Debug, Default)]
struct DatasetState {
    movies: Vec<Movie>,
    status: LoadingStatus,
    fetched_at: i64,
    grounding: Vec<GroundingReference>,
    /// Bumped by `clear_cache`; a fetch that started under an older epoch is discarded
    epoch: u64,
}

impl DatasetState {
    fn snapshot(&self, dataset: Dataset) -> DatasetSnapshot {
        DatasetSnapshot {
            dataset,
            movies: self.movies.clone(),
            status: self.status,
            fetched_at: self.fetched_at,
            grounding: self.grounding.clone(),
        }
    }

    /// Trigger rule evaluated on tab activation
    fn needs_refresh(&self, dataset: Dataset, now: i64) -> bool {
        let stale = is_stale(self.fetched_at, now);
        match dataset {
            Dataset::Hits | Dataset::Ott => {
                (self.movies.is_empty() || stale) && self.status == LoadingStatus::Idle
            }
            Dataset::Watchlist => !self.movies.is_empty() && stale && !self.status.is_loading(),
        }
    }
}

/// Cheap to clone; clones share the same dataset state
#[derive(Clone)]
pub struct RefreshController {
    generator: GenerationClient,
    prompts: PromptBuilder,
    cache: CacheStore,
    matcher: Arc<dyn TitleMatcher>,
    match_policy: MatchPolicy,
    clock: Arc<dyn Clock>,
    hits: Arc<Mutex<DatasetState>>,
    ott: Arc<Mutex<DatasetState>>,
    watchlist: Arc<Mutex<DatasetState>>,
    notifications: broadcast::Sender<Notification>,
    latest_notification: Arc<Mutex<Option<Notification>>>,
}

impl RefreshController {
    /// Creates a controller with every dataset restored from the cache
    pub async fn restore(
        generator: GenerationClient,
        prompts: PromptBuilder,
        cache: CacheStore,
    ) -> AppResult<Self> {
        let mut restored = Vec::with_capacity(Dataset::ALL.len());
        for dataset in Dataset::ALL {
            let cached = cache.load(dataset).await?;
            tracing::info!(
                dataset = %dataset,
                movies = cached.movies.len(),
                fetched_at = cached.fetched_at,
                "Restored dataset from cache"
            );
            restored.push(DatasetState {
                movies: cached.movies,
                fetched_at: cached.fetched_at,
                ..DatasetState::default()
            });
        }

        let mut restored = restored.into_iter();
        let (notifications, _) = broadcast::channel(NOTIFICATION_CHANNEL_CAPACITY);

        Ok(Self {
            generator,
            prompts,
            cache,
            matcher: Arc::new(ContainmentMatcher),
            match_policy: MatchPolicy::default(),
            clock: Arc::new(SystemClock),
            hits: Arc::new(Mutex::new(restored.next().unwrap_or_default())),
            ott: Arc::new(Mutex::new(restored.next().unwrap_or_default())),
            watchlist: Arc::new(Mutex::new(restored.next().unwrap_or_default())),
            notifications,
            latest_notification: Arc::new(Mutex::new(None)),
        })
    }

    pub fn with_matcher(mut self, matcher: Arc<dyn TitleMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn with_match_policy(mut self, policy: MatchPolicy) -> Self {
        self.match_policy = policy;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn slot(&self, dataset: Dataset) -> &Mutex<DatasetState> {
        match dataset {
            Dataset::Hits => self.hits.as_ref(),
            Dataset::Ott => self.ott.as_ref(),
            Dataset::Watchlist => self.watchlist.as_ref(),
        }
    }

    /// Current movies, status and timestamp of a dataset
    pub async fn snapshot(&self, dataset: Dataset) -> DatasetSnapshot {
        self.slot(dataset).lock().await.snapshot(dataset)
    }

    /// Whether activating the dataset now would trigger a fetch
    pub async fn needs_refresh(&self, dataset: Dataset) -> bool {
        let now = self.clock.now().timestamp_millis();
        self.slot(dataset).lock().await.needs_refresh(dataset, now)
    }

    /// Refreshes the dataset if its trigger rule says so
    pub async fn activate(&self, dataset: Dataset) -> RefreshOutcome {
        let now = self.clock.now().timestamp_millis();
        let skip = {
            let state = self.slot(dataset).lock().await;
            if state.needs_refresh(dataset, now) {
                None
            } else if state.status.is_loading() {
                Some(SkipReason::AlreadyLoading)
            } else {
                Some(SkipReason::NotDue)
            }
        };

        match skip {
            Some(reason) => {
                tracing::debug!(dataset = %dataset, reason = ?reason, "Activation skipped refresh");
                RefreshOutcome::Skipped { reason }
            }
            None => self.refresh(dataset).await,
        }
    }

    /// Fetches the dataset from the generation service
    ///
    /// A no-op while the dataset is already loading. Failures leave the
    /// previous movies and timestamp in place and set the status to `Error`.
    /// The fetch itself runs on a spawned task and settles even if the
    /// returned future is dropped.
    pub async fn refresh(&self, dataset: Dataset) -> RefreshOutcome {
        let controller = self.clone();
        let task = tokio::spawn(async move { controller.run_refresh(dataset).await });

        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(dataset = %dataset, error = %e, "Refresh task aborted");
                let mut state = self.slot(dataset).lock().await;
                if state.status.is_loading() {
                    state.status = LoadingStatus::Error;
                }
                RefreshOutcome::Failed {
                    error: AppError::Internal(e.to_string()).to_string(),
                }
            }
        }
    }

    #[tracing::instrument(skip(self))]
    async fn run_refresh(&self, dataset: Dataset) -> RefreshOutcome {
        let (epoch, watchlist) = {
            let mut state = self.slot(dataset).lock().await;
            if state.status.is_loading() {
                tracing::debug!("Refresh already in flight, ignoring trigger");
                return RefreshOutcome::Skipped {
                    reason: SkipReason::AlreadyLoading,
                };
            }
            if dataset == Dataset::Watchlist && state.movies.is_empty() {
                return RefreshOutcome::Skipped {
                    reason: SkipReason::EmptyWatchlist,
                };
            }
            state.status = LoadingStatus::Loading;
            (state.epoch, state.movies.clone())
        };

        let request = match dataset {
            Dataset::Hits => self.prompts.theatrical_hits(self.clock.now()),
            Dataset::Ott => self.prompts.ott_releases(),
            Dataset::Watchlist => self.prompts.watchlist_availability(&watchlist),
        };

        tracing::info!("Refreshing dataset");

        match self.generator.generate(&request).await {
            Ok(response) => self.commit(dataset, epoch, response).await,
            Err(e) => self.fail(dataset, epoch, AppError::from(e)).await,
        }
    }

    async fn commit(
        &self,
        dataset: Dataset,
        epoch: u64,
        response: GenerationResponse,
    ) -> RefreshOutcome {
        let mut state = self.slot(dataset).lock().await;
        if state.epoch != epoch {
            tracing::info!("Cache cleared during fetch, discarding result");
            state.status = LoadingStatus::Idle;
            return RefreshOutcome::Discarded;
        }

        let now = self.clock.now();
        let fetched_at = now.timestamp_millis();

        let (movies, malformed, newly_available) = match dataset {
            Dataset::Hits | Dataset::Ott => {
                let result = parser::parse_movies(&response);
                (result.movies, result.malformed, 0)
            }
            Dataset::Watchlist => {
                let updates = parser::parse_updates(&response.text);
                // Merge against the list as it is now so toggles made during the fetch survive
                let report = merge::merge(
                    &state.movies,
                    &updates.items,
                    self.matcher.as_ref(),
                    self.match_policy,
                    now,
                );
                let newly_available = merge::count_newly_available(&state.movies, &report.watchlist);
                tracing::info!(
                    matched = report.matched,
                    unmatched = report.unmatched_updates.len(),
                    newly_available,
                    "Merged watchlist availability updates"
                );
                (report.watchlist, updates.malformed, newly_available)
            }
        };

        if let Err(e) = self.cache.put(dataset, &movies, fetched_at).await {
            tracing::error!(error = %e, "Failed to persist refreshed dataset");
            state.status = LoadingStatus::Error;
            return RefreshOutcome::Failed {
                error: e.to_string(),
            };
        }

        let count = movies.len();
        state.movies = movies;
        state.fetched_at = fetched_at;
        state.grounding = response.grounding;
        state.status = if malformed {
            tracing::warn!("Upstream response was malformed, dataset is an empty fallback");
            LoadingStatus::SuccessEmptySuspect
        } else {
            LoadingStatus::Success
        };
        drop(state);

        tracing::info!(movies = count, fetched_at, "Dataset refreshed");

        if newly_available > 0 {
            self.notify(Notification::newly_available(newly_available, now))
                .await;
        }

        RefreshOutcome::Refreshed {
            movies: count,
            suspect: malformed,
            newly_available,
        }
    }

    async fn fail(&self, dataset: Dataset, epoch: u64, error: AppError) -> RefreshOutcome {
        let mut state = self.slot(dataset).lock().await;
        if state.epoch != epoch {
            state.status = LoadingStatus::Idle;
            return RefreshOutcome::Discarded;
        }

        tracing::error!(
            error = %error,
            kept_movies = state.movies.len(),
            "Refresh failed, keeping cached data"
        );
        state.status = LoadingStatus::Error;
        RefreshOutcome::Failed {
            error: error.to_string(),
        }
    }

    async fn notify(&self, notification: Notification) {
        tracing::info!(message = %notification.message, "Raising notification");
        *self.latest_notification.lock().await = Some(notification.clone());
        // No subscribers is fine; the latest notification is still kept
        let _ = self.notifications.send(notification);
    }

    /// Subscribes to notifications raised by future refreshes
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    pub async fn latest_notification(&self) -> Option<Notification> {
        self.latest_notification.lock().await.clone()
    }

    pub async fn dismiss_notification(&self) -> Option<Notification> {
        self.latest_notification.lock().await.take()
    }

    /// Adds the movie if no entry has its exact title, removes that entry otherwise
    pub async fn toggle_watchlist(&self, movie: Movie) -> AppResult<ToggleOutcome> {
        let mut state = self.watchlist.lock().await;
        let exists = state.movies.iter().any(|m| m.title == movie.title);

        let (updated, outcome) = if exists {
            let updated: Vec<Movie> = state
                .movies
                .iter()
                .filter(|m| m.title != movie.title)
                .cloned()
                .collect();
            (updated, ToggleOutcome::Removed)
        } else {
            let mut updated = state.movies.clone();
            updated.push(movie);
            (updated, ToggleOutcome::Added)
        };

        self.cache.put_movies(Dataset::Watchlist, &updated).await?;
        state.movies = updated;

        tracing::info!(outcome = ?outcome, size = state.movies.len(), "Watchlist toggled");
        Ok(outcome)
    }

    /// Adds the movie unless its title is already present; returns whether it was added
    pub async fn add_to_watchlist(&self, movie: Movie) -> AppResult<bool> {
        let mut state = self.watchlist.lock().await;
        if state.movies.iter().any(|m| m.title == movie.title) {
            return Ok(false);
        }

        let mut updated = state.movies.clone();
        updated.push(movie);
        self.cache.put_movies(Dataset::Watchlist, &updated).await?;
        state.movies = updated;
        Ok(true)
    }

    /// Removes the entry with this exact title; returns whether one existed
    pub async fn remove_from_watchlist(&self, title: &str) -> AppResult<bool> {
        let mut state = self.watchlist.lock().await;
        if !state.movies.iter().any(|m| m.title == title) {
            return Ok(false);
        }

        let updated: Vec<Movie> = state
            .movies
            .iter()
            .filter(|m| m.title != title)
            .cloned()
            .collect();
        self.cache.put_movies(Dataset::Watchlist, &updated).await?;
        state.movies = updated;
        Ok(true)
    }

    pub async fn is_in_watchlist(&self, title: &str) -> bool {
        self.watchlist
            .lock()
            .await
            .movies
            .iter()
            .any(|m| m.title == title)
    }

    /// Purges the hits and streaming caches; the watchlist is untouched
    pub async fn clear_cache(&self) -> AppResult<()> {
        for dataset in [Dataset::Hits, Dataset::Ott] {
            let mut state = self.slot(dataset).lock().await;
            self.cache.clear(dataset).await?;

            state.movies.clear();
            state.grounding.clear();
            state.fetched_at = 0;
            state.epoch += 1;
            // An in-flight fetch keeps the Loading guard until it completes and is discarded
            if !state.status.is_loading() {
                state.status = LoadingStatus::Idle;
            }
        }

        tracing::info!("Cleared hits and streaming caches");
        Ok(())
    }

    /// Email draft for the dataset's current list, `None` when it is empty
    pub async fn compose_email(&self, dataset: Dataset) -> Option<EmailDraft> {
        let state = self.slot(dataset).lock().await;
        email::compose_email(dataset, &state.movies)
    }
}
