use chrono::{DateTime, SecondsFormat, Utc};

use crate::models::{AvailabilityUpdate, Movie};

/// Strategy deciding whether an update refers to a watchlist entry
pub trait TitleMatcher: Send + Sync {
    fn matches(&self, entry_title: &str, update_title: &str) -> bool;
}

/// Titles must be byte-for-byte equal
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMatcher;

impl TitleMatcher for ExactMatcher {
    fn matches(&self, entry_title: &str, update_title: &str) -> bool {
        entry_title == update_title
    }
}

/// Titles equal after lowercasing and dropping everything but letters and digits
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizedMatcher;

fn normalize(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

impl TitleMatcher for NormalizedMatcher {
    fn matches(&self, entry_title: &str, update_title: &str) -> bool {
        normalize(entry_title) == normalize(update_title)
    }
}

/// Case-insensitive substring match in either direction
///
/// Tolerates the model adding subtitles or punctuation ("Dune" vs
/// "Dune: Part Two"), at the cost of ambiguity for short titles.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContainmentMatcher;

impl TitleMatcher for ContainmentMatcher {
    fn matches(&self, entry_title: &str, update_title: &str) -> bool {
        let entry = entry_title.to_lowercase();
        let update = update_title.to_lowercase();
        update.contains(&entry) || entry.contains(&update)
    }
}

/// Whether one update may be applied to several watchlist entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchPolicy {
    /// Every entry picks its first matching update independently
    Shared,
    /// An update is consumed by the first entry that matches it
    #[default]
    Exclusive,
}

/// Result of reconciling availability updates into a watchlist
#[derive(Debug, Clone, PartialEq)]
pub struct MergeReport {
    /// Same length and order as the input watchlist
    pub watchlist: Vec<Movie>,
    /// Entries that received an update
    pub matched: usize,
    /// Titles of updates that matched no entry
    pub unmatched_updates: Vec<String>,
}

/// Applies availability updates to a watchlist without changing its membership
///
/// For each entry the first matching update (in update order) replaces its
/// availability and stamps `last_updated` with `now`. Entries without a match
/// pass through untouched. Updates with a blank title never match.
pub fn merge(
    current: &[Movie],
    updates: &[AvailabilityUpdate],
    matcher: &dyn TitleMatcher,
    policy: MatchPolicy,
    now: DateTime<Utc>,
) -> MergeReport {
    let stamp = now.to_rfc3339_opts(SecondsFormat::Millis, true);
    let mut used = vec![false; updates.len()];
    let mut matched = 0;

    let watchlist = current
        .iter()
        .map(|movie| {
            let found = updates.iter().enumerate().find(|(i, update)| {
                !update.title.trim().is_empty()
                    && !(policy == MatchPolicy::Exclusive && used[*i])
                    && matcher.matches(&movie.title, &update.title)
            });

            match found {
                Some((i, update)) => {
                    used[i] = true;
                    matched += 1;
                    Movie {
                        availability: update.availability.clone(),
                        last_updated: Some(stamp.clone()),
                        ..movie.clone()
                    }
                }
                None => movie.clone(),
            }
        })
        .collect::<Vec<_>>();

    let unmatched_updates: Vec<String> = updates
        .iter()
        .zip(&used)
        .filter(|(_, used)| !**used)
        .map(|(update, _)| update.title.clone())
        .collect();

    if !unmatched_updates.is_empty() {
        tracing::debug!(
            unmatched = ?unmatched_updates,
            "Availability updates matched no watchlist entry"
        );
    }

    MergeReport {
        watchlist,
        matched,
        unmatched_updates,
    }
}

/// Count of entries that left theaters / not-available between two merges
///
/// Both slices must be index-aligned, which `merge` guarantees.
pub fn count_newly_available(before: &[Movie], after: &[Movie]) -> usize {
    before
        .iter()
        .zip(after)
        .filter(|(old, new)| old.is_unreleased_for_streaming() && !new.is_unreleased_for_streaming())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn update(title: &str, availability: &str) -> AvailabilityUpdate {
        AvailabilityUpdate {
            title: title.to_string(),
            availability: availability.to_string(),
        }
    }

    fn run(current: &[Movie], updates: &[AvailabilityUpdate]) -> MergeReport {
        merge(current, updates, &ContainmentMatcher, MatchPolicy::Shared, now())
    }

    #[test]
    fn test_matched_entry_updated_and_stamped() {
        let current = vec![Movie::new("Movie A", "Theaters")];
        let report = run(&current, &[update("Movie A", "Netflix")]);

        assert_eq!(report.watchlist[0].availability, "Netflix");
        assert_eq!(
            report.watchlist[0].last_updated.as_deref(),
            Some("2025-06-01T12:00:00.000Z")
        );
        assert_eq!(report.matched, 1);
        assert!(report.unmatched_updates.is_empty());
    }

    #[test]
    fn test_unmatched_entry_passes_through() {
        let current = vec![
            Movie::new("Movie A", "Theaters"),
            Movie::new("Other", "Theaters"),
        ];
        let report = run(&current, &[update("Movie A", "Netflix")]);

        assert_eq!(report.watchlist[1], current[1]);
    }

    #[test]
    fn test_containment_either_direction() {
        let current = vec![
            Movie::new("Dune", "Theaters"),
            Movie::new("Kalki 2898 AD (Hindi)", "Theaters"),
        ];
        let report = run(
            &current,
            &[update("dune: part two", "Max"), update("Kalki 2898 AD", "Prime Video")],
        );

        assert_eq!(report.watchlist[0].availability, "Max");
        assert_eq!(report.watchlist[1].availability, "Prime Video");
    }

    #[test]
    fn test_first_matching_update_wins() {
        let current = vec![Movie::new("Movie A", "Theaters")];
        let report = run(
            &current,
            &[update("Movie A", "Netflix"), update("movie a", "Prime Video")],
        );

        assert_eq!(report.watchlist[0].availability, "Netflix");
        assert_eq!(report.unmatched_updates, vec!["movie a".to_string()]);
    }

    #[test]
    fn test_shared_policy_reuses_update() {
        let current = vec![Movie::new("Up", "Theaters"), Movie::new("Upgrade", "Theaters")];
        let report = run(&current, &[update("Upgrade", "Peacock")]);

        assert_eq!(report.watchlist[0].availability, "Peacock");
        assert_eq!(report.watchlist[1].availability, "Peacock");
        assert_eq!(report.matched, 2);
    }

    #[test]
    fn test_exclusive_policy_consumes_update() {
        let current = vec![Movie::new("Up", "Theaters"), Movie::new("Upgrade", "Theaters")];
        let report = merge(
            &current,
            &[update("Upgrade", "Peacock")],
            &ContainmentMatcher,
            MatchPolicy::Exclusive,
            now(),
        );

        assert_eq!(report.watchlist[0].availability, "Peacock");
        assert_eq!(report.watchlist[1], current[1]);
        assert_eq!(report.matched, 1);
    }

    #[test]
    fn test_blank_update_title_never_matches() {
        let current = vec![Movie::new("Movie A", "Theaters")];
        let report = run(&current, &[update("  ", "Netflix")]);

        assert_eq!(report.watchlist[0], current[0]);
        assert_eq!(report.unmatched_updates.len(), 1);
    }

    #[test]
    fn test_merge_preserves_length_and_order() {
        let current: Vec<Movie> = ["C", "A", "B", "A"]
            .iter()
            .map(|t| Movie::new(*t, "Theaters"))
            .collect();
        let updates = [update("A", "Netflix"), update("Z", "Hulu")];

        let cases: [&[AvailabilityUpdate]; 3] = [&updates[..], &[], &updates[1..]];
        for case in cases {
            let report = run(&current, case);
            assert_eq!(report.watchlist.len(), current.len());
            let titles: Vec<&str> = report.watchlist.iter().map(|m| m.title.as_str()).collect();
            assert_eq!(titles, vec!["C", "A", "B", "A"]);
        }
    }

    #[test]
    fn test_merge_is_idempotent() {
        let current = vec![
            Movie::new("Movie A", "Theaters"),
            Movie::new("Movie B", "Netflix"),
            Movie::new("Movie C", "Theaters"),
        ];
        let updates = [update("Movie A", "Netflix"), update("Movie B", "Prime Video")];

        let once = run(&current, &updates);
        let twice = run(&once.watchlist, &updates);

        assert_eq!(twice.watchlist, once.watchlist);
    }

    #[test]
    fn test_default_policy_is_exclusive() {
        assert_eq!(MatchPolicy::default(), MatchPolicy::Exclusive);
    }

    #[test]
    fn test_exact_matcher() {
        assert!(ExactMatcher.matches("Movie A", "Movie A"));
        assert!(!ExactMatcher.matches("Movie A", "movie a"));
    }

    #[test]
    fn test_normalized_matcher() {
        assert!(NormalizedMatcher.matches("Spider-Man: No Way Home", "spiderman no way home"));
        assert!(!NormalizedMatcher.matches("Dune", "Dune Part Two"));
    }

    #[test]
    fn test_count_newly_available() {
        let before = vec![
            Movie::new("A", "Theaters"),
            Movie::new("B", "Not available"),
            Movie::new("C", "Netflix"),
            Movie::new("D", "Theaters"),
        ];
        let after = vec![
            Movie::new("A", "Netflix"),
            Movie::new("B", "Prime Video"),
            Movie::new("C", "Hulu"),
            Movie::new("D", "Theaters"),
        ];

        assert_eq!(count_newly_available(&before, &after), 2);
    }
}
