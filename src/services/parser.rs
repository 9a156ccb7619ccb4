/// Tolerant decoding of model output
///
/// The model is told to answer with a bare JSON array but regularly wraps it
/// in code fences or adds commentary around it. Nothing here returns an
/// error: undecodable text becomes an empty list flagged as malformed.
use serde::de::DeserializeOwned;

use crate::{
    models::{AvailabilityUpdate, Movie, SearchResult},
    services::generation::GenerationResponse,
};

/// Decoded records plus whether the text had to be discarded
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<T> {
    pub items: Vec<T>,
    pub malformed: bool,
}

/// Removes markdown code fence markers and surrounding whitespace
pub fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

/// Slices from the first `[` to the last `]`, or returns the input unchanged
pub fn extract_json_array(cleaned: &str) -> &str {
    match (cleaned.find('['), cleaned.rfind(']')) {
        (Some(start), Some(end)) if end > start => &cleaned[start..=end],
        _ => cleaned,
    }
}

/// Decodes a JSON array of `T` out of noisy model text
pub fn parse_array<T: DeserializeOwned>(raw: &str) -> Parsed<T> {
    let cleaned = strip_code_fences(raw);
    let candidate = extract_json_array(&cleaned);

    match serde_json::from_str::<Vec<T>>(candidate) {
        Ok(items) => Parsed {
            items,
            malformed: false,
        },
        Err(e) => {
            tracing::warn!(
                error = %e,
                chars = raw.len(),
                "Failed to parse model output as JSON array, using empty result"
            );
            Parsed {
                items: Vec::new(),
                malformed: true,
            }
        }
    }
}

/// Parses a hits or streaming-releases response
pub fn parse_movies(response: &GenerationResponse) -> SearchResult {
    let parsed = parse_array::<Movie>(&response.text);
    SearchResult {
        movies: parsed.items,
        grounding: response.grounding.clone(),
        malformed: parsed.malformed,
    }
}

/// Parses a watchlist availability response
pub fn parse_updates(raw: &str) -> Parsed<AvailabilityUpdate> {
    parse_array(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GroundingReference;

    const MOVIES_JSON: &str = r#"[
        {"title": "Movie A", "language": "English", "availability": "Theaters"},
        {"title": "Movie B", "language": "Tamil", "availability": "Netflix", "cast": ["X", "Y"]}
    ]"#;

    #[test]
    fn test_noisy_response_matches_clean_json() {
        let noisy = format!("Here you go:\n```json\n{}\n```\nEnjoy!", MOVIES_JSON);

        let clean = parse_array::<Movie>(MOVIES_JSON);
        let wrapped = parse_array::<Movie>(&noisy);

        assert!(!wrapped.malformed);
        assert_eq!(wrapped, clean);
        assert_eq!(wrapped.items.len(), 2);
        assert_eq!(wrapped.items[1].cast.as_ref().unwrap(), &vec!["X", "Y"]);
    }

    #[test]
    fn test_commentary_without_fences() {
        let raw = format!("Sure! {} Let me know if you need more.", MOVIES_JSON);
        let parsed = parse_array::<Movie>(&raw);
        assert_eq!(parsed.items.len(), 2);
    }

    #[test]
    fn test_missing_brackets_yields_empty() {
        let parsed = parse_array::<Movie>("I could not find any movies this month.");
        assert!(parsed.items.is_empty());
        assert!(parsed.malformed);
    }

    #[test]
    fn test_unbalanced_brackets_yields_empty() {
        let parsed = parse_array::<Movie>(r#"[{"title": "Movie A"}"#);
        assert!(parsed.items.is_empty());
        assert!(parsed.malformed);

        let parsed = parse_array::<Movie>(r#"] oops ["#);
        assert!(parsed.items.is_empty());
        assert!(parsed.malformed);
    }

    #[test]
    fn test_empty_array_is_not_malformed() {
        let parsed = parse_array::<Movie>("```json\n[]\n```");
        assert!(parsed.items.is_empty());
        assert!(!parsed.malformed);
    }

    #[test]
    fn test_wrong_shape_yields_empty() {
        let parsed = parse_array::<Movie>(r#"[{"name": "no title field"}]"#);
        assert!(parsed.items.is_empty());
        assert!(parsed.malformed);
    }

    #[test]
    fn test_parse_movies_passes_grounding_through() {
        let response = GenerationResponse {
            text: "not json".to_string(),
            grounding: vec![GroundingReference {
                uri: "https://example.com".to_string(),
                title: "Example".to_string(),
            }],
        };

        let result = parse_movies(&response);

        assert!(result.movies.is_empty());
        assert!(result.malformed);
        assert_eq!(result.grounding.len(), 1);
    }

    #[test]
    fn test_parse_updates() {
        let parsed = parse_updates(
            "```json\n[{\"title\": \"Movie A\", \"availability\": \"Netflix\"}]\n```",
        );
        assert_eq!(
            parsed.items,
            vec![AvailabilityUpdate {
                title: "Movie A".to_string(),
                availability: "Netflix".to_string(),
            }]
        );
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fences("  [1]  "), "[1]");
    }

    #[test]
    fn test_extract_json_array() {
        assert_eq!(extract_json_array("a [1, [2]] b"), "[1, [2]]");
        assert_eq!(extract_json_array("no brackets"), "no brackets");
    }
}
