use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User-facing alert raised by a refresh
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub message: String,
    /// Watchlist entries that moved out of theaters on the last check
    pub newly_available: usize,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Creates the alert for watchlist titles that became streamable
    pub fn newly_available(count: usize, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            message: format!("{} movies in your watchlist are now streaming!", count),
            newly_available: count,
            created_at,
        }
    }
}
