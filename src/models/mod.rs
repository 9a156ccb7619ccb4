use serde::{Deserialize, Serialize};

pub mod dataset;
pub mod notification;

pub use dataset::{Dataset, DatasetSnapshot, LoadingStatus};
pub use notification::Notification;

/// Sentinel the upstream uses for a rating it could not find
pub const RATING_NOT_AVAILABLE: &str = "N/A";

fn default_rating() -> String {
    RATING_NOT_AVAILABLE.to_string()
}

/// A movie as returned by the generation service and kept in every dataset
///
/// Field names follow the camelCase JSON the upstream is asked to produce.
/// Only `title` is required; the model routinely omits the rest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub title: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub release_date: String,
    /// Free-form label such as "Blockbuster" or "Critical Darling"
    #[serde(default)]
    pub status: String,
    #[serde(default = "default_rating")]
    pub rotten_tomatoes: String,
    #[serde(default = "default_rating")]
    pub imdb: String,
    /// "Theaters" or the name of a streaming platform
    #[serde(default)]
    pub availability: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub reddit_vibe: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub director: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cast: Option<Vec<String>>,
}

impl Movie {
    /// Creates a movie with only title and availability set
    pub fn new(title: impl Into<String>, availability: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            language: String::new(),
            release_date: String::new(),
            status: String::new(),
            rotten_tomatoes: default_rating(),
            imdb: default_rating(),
            availability: availability.into(),
            summary: String::new(),
            reddit_vibe: String::new(),
            last_updated: None,
            director: None,
            cast: None,
        }
    }

    /// Whether the movie is still only in theaters or not yet available anywhere
    pub fn is_unreleased_for_streaming(&self) -> bool {
        is_theatrical_availability(&self.availability)
    }
}

/// Availability values meaning "you can't stream this yet"
pub fn is_theatrical_availability(availability: &str) -> bool {
    let lowered = availability.to_lowercase();
    lowered == "theaters" || lowered.contains("not available")
}

/// Whether a rating string carries an actual score
pub fn has_rating(rating: &str) -> bool {
    !rating.trim().is_empty() && rating != RATING_NOT_AVAILABLE
}

/// Source citation attached to a grounded generation result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroundingReference {
    pub uri: String,
    pub title: String,
}

/// One entry of a watchlist availability check response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AvailabilityUpdate {
    pub title: String,
    pub availability: String,
}

/// Parsed movies plus the citations that accompanied them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResult {
    pub movies: Vec<Movie>,
    pub grounding: Vec<GroundingReference>,
    /// The response text could not be decoded; `movies` is empty as a fallback
    pub malformed: bool,
}

/// Shareable rendering of a list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmailDraft {
    pub subject: String,
    pub body: String,
}
