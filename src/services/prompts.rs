use chrono::{DateTime, Datelike, Month, Utc};

use crate::{models::Movie, services::generation::GenerationRequest};

/// Month name and year of the calendar month before `now`
pub fn previous_month(now: DateTime<Utc>) -> (String, i32) {
    let (month, year) = match now.month() {
        1 => (12, now.year() - 1),
        m => (m - 1, now.year()),
    };

    let name = Month::try_from(month as u8)
        .map(|m| m.name().to_string())
        .unwrap_or_default();

    (name, year)
}

/// Builds generation requests for each dataset
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    model: String,
}

impl PromptBuilder {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }

    fn request(&self, prompt: String) -> GenerationRequest {
        GenerationRequest {
            model: self.model.clone(),
            prompt,
            search_grounding: true,
        }
    }

    /// Theatrical and critical hits released in the previous calendar month
    pub fn theatrical_hits(&self, now: DateTime<Utc>) -> GenerationRequest {
        let (month, year) = previous_month(now);
        self.request(format!(
            r#"
    Find a list of movies released in {month} {year} that are critically acclaimed OR box office hits.

    CRITICAL INSTRUCTIONS:
    1. Search for: English, Malayalam, Tamil, Telugu, and Hindi movies.
    2. Criteria: High ratings, commercial success, or high discussion on Reddit.
    3. Output: A strict JSON array of objects.

    JSON Format:
    [
      {{
        "title": "Movie Title",
        "language": "Language",
        "releaseDate": "YYYY-MM-DD",
        "status": "Blockbuster/Hit/Critical Darling",
        "rottenTomatoes": "90% or N/A",
        "imdb": "8.0/10 or N/A",
        "availability": "Theaters or Specific OTT Name",
        "summary": "Short summary",
        "redditVibe": "What redditors are saying",
        "director": "Director Name",
        "cast": ["Actor 1", "Actor 2", "Actor 3"]
      }}
    ]

    Do not add any text outside the JSON.
"#
        ))
    }

    /// Well-reviewed movies that reached streaming platforms in the last 30 days
    pub fn ott_releases(&self) -> GenerationRequest {
        self.request(
            r#"
    Find a list of movies that were newly released on streaming platforms (Netflix, Prime, Disney+, Hotstar, SonyLIV, SunNXT, ManoramaMax) in the last 30 days.

    CRITICAL INSTRUCTIONS:
    1. Filter for Quality: Only include movies with good reviews (RT > 70% or IMDb > 7.0) or massive audience hype.
    2. Output: A strict JSON array of objects.

    JSON Format:
    [
      {
        "title": "Movie Title",
        "language": "Language",
        "releaseDate": "YYYY-MM-DD",
        "status": "Fresh on OTT",
        "rottenTomatoes": "Score",
        "imdb": "Score",
        "availability": "Specific OTT Platform Name",
        "summary": "Short summary",
        "redditVibe": "Reaction to OTT release",
        "director": "Director Name",
        "cast": ["Actor 1", "Actor 2", "Actor 3"]
      }
    ]

    Do not add any text outside the JSON.
"#
            .to_string(),
        )
    }

    /// Current availability of every watchlist title
    pub fn watchlist_availability(&self, watchlist: &[Movie]) -> GenerationRequest {
        let titles = watchlist
            .iter()
            .map(|m| format!("{} ({})", m.title, m.language))
            .collect::<Vec<_>>()
            .join(", ");

        self.request(format!(
            r#"
    I have a watchlist of movies: {titles}.
    For each movie, find out WHERE it is currently available to watch (Theaters or specific OTT platform).

    Output a strict JSON array of objects with the updated availability.
    [
      {{
        "title": "Movie Title",
        "availability": "Updated Platform or Theaters"
      }}
    ]
"#
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_previous_month_mid_year() {
        let now = Utc.with_ymd_and_hms(2025, 7, 15, 12, 0, 0).unwrap();
        assert_eq!(previous_month(now), ("June".to_string(), 2025));
    }

    #[test]
    fn test_previous_month_wraps_year() {
        let now = Utc.with_ymd_and_hms(2025, 1, 3, 0, 0, 0).unwrap();
        assert_eq!(previous_month(now), ("December".to_string(), 2024));
    }

    #[test]
    fn test_hits_request_mentions_month() {
        let builder = PromptBuilder::new("gemini-2.5-flash");
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let request = builder.theatrical_hits(now);

        assert_eq!(request.model, "gemini-2.5-flash");
        assert!(request.search_grounding);
        assert!(request.prompt.contains("released in February 2025"));
        assert!(request.prompt.contains("\"redditVibe\""));
    }

    #[test]
    fn test_watchlist_request_lists_titles_with_language() {
        let builder = PromptBuilder::new("m");
        let mut a = Movie::new("Movie A", "Theaters");
        a.language = "Hindi".to_string();
        let mut b = Movie::new("Movie B", "Netflix");
        b.language = "Telugu".to_string();

        let request = builder.watchlist_availability(&[a, b]);

        assert!(request
            .prompt
            .contains("watchlist of movies: Movie A (Hindi), Movie B (Telugu)."));
    }
}
