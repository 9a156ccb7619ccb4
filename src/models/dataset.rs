use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

use super::{GroundingReference, Movie};

/// One of the three independently cached movie collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dataset {
    /// Theatrical and critical hits from last month
    Hits,
    /// New streaming releases
    Ott,
    /// The user's curated watchlist
    Watchlist,
}

impl Dataset {
    pub const ALL: [Dataset; 3] = [Dataset::Hits, Dataset::Ott, Dataset::Watchlist];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dataset::Hits => "hits",
            Dataset::Ott => "ott",
            Dataset::Watchlist => "watchlist",
        }
    }

    /// Human-readable list name used when sharing
    pub fn list_name(&self) -> &'static str {
        match self {
            Dataset::Hits => "Latest Movie Hits",
            Dataset::Ott => "Fresh OTT Releases",
            Dataset::Watchlist => "My Movie Watchlist",
        }
    }
}

impl Display for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Dataset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hits" => Ok(Dataset::Hits),
            "ott" => Ok(Dataset::Ott),
            "watchlist" => Ok(Dataset::Watchlist),
            other => Err(format!("Unknown dataset '{}'", other)),
        }
    }
}

/// Per-dataset fetch status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoadingStatus {
    #[default]
    Idle,
    Loading,
    Success,
    /// Fetch succeeded but the response body could not be decoded, so the
    /// result is empty. Treated as `Success` by every trigger rule.
    SuccessEmptySuspect,
    Error,
}

impl LoadingStatus {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadingStatus::Loading)
    }
}

/// What the presentation layer sees for one dataset
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSnapshot {
    pub dataset: Dataset,
    pub movies: Vec<Movie>,
    pub status: LoadingStatus,
    /// Epoch milliseconds of the last successful fetch, 0 if never
    pub fetched_at: i64,
    pub grounding: Vec<GroundingReference>,
}
