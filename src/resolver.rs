//! Best-match resolution of wildcard names to files
//!
//! A `__token__` rarely names a file exactly: users write `__color__` for
//! `colors.txt`, or `__flowers2__` for `flowers-2.txt`. Every candidate file
//! is scored against the query and the best positive score wins.
//!
//! Scoring tiers (highest first):
//! - 200: perfect path match
//! - 100: exact stem match
//! - 95/85: numeric near match when the query itself ends in a number
//! - 90: base-version match (query with trailing digits stripped)
//! - 80: `<query>-<N>` numbered variant
//! - 50: case-sensitive prefix match
//! - 40: substring-contains match
//!
//! Within a tier, files closer to their search root win: each directory
//! level below the root costs 0.0001.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::paths::SearchRoots;

static TRAILING_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)$").unwrap());
static DASH_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"-(\d+)").unwrap());

/// How well one candidate file matches a requested name
#[derive(Debug, Clone, PartialEq)]
pub struct MatchScore {
    /// Higher is better; anything at or below zero is "no match"
    pub score: f64,
    /// Human-readable reason for the score, for diagnostics
    pub reason: String,
}

impl MatchScore {
    fn none() -> Self {
        Self {
            score: 0.0,
            reason: "no match".to_string(),
        }
    }
}

/// Score how well a candidate file matches the requested name.
///
/// `root` is the search root owning the candidate, used to compute the
/// depth penalty; without one the candidate's own component count is used.
pub fn score_filename_match(name: &str, candidate: &Path, root: Option<&Path>) -> MatchScore {
    let stem = match candidate.file_stem().and_then(|s| s.to_str()) {
        Some(s) => s,
        None => return MatchScore::none(),
    };
    let file_name = match candidate.file_name().and_then(|s| s.to_str()) {
        Some(s) => s,
        None => return MatchScore::none(),
    };

    // Directory levels below the search root
    let depth = match root.and_then(|r| candidate.strip_prefix(r).ok()) {
        Some(rel) => rel.components().count().saturating_sub(1),
        None => candidate.components().count().saturating_sub(1),
    };
    let penalty = depth as f64 * 0.0001;

    // The query stem, directories and extension stripped
    let name_stem = Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name);

    // Perfect path match (highest priority)
    if candidate == Path::new(name) {
        return MatchScore {
            score: 200.0,
            reason: "perfect path match".to_string(),
        };
    }

    // Exact stem match
    if stem == name_stem {
        return MatchScore {
            score: 100.0 - penalty,
            reason: format!("exact match (depth: {depth})"),
        };
    }

    // Base version: `__flowers2__` should still find flowers.txt
    let base_search_name = TRAILING_DIGITS
        .replace(name_stem, "")
        .trim_end_matches('-')
        .to_string();
    if stem == base_search_name {
        return MatchScore {
            score: 90.0 - penalty,
            reason: format!("base version match (depth: {depth})"),
        };
    }

    // Numbered variant of the exact name: flowers -> flowers-2.txt
    if file_name.starts_with(&format!("{name}-")) {
        if let Some(num) = first_dash_number(file_name) {
            return MatchScore {
                score: 80.0 + num as f64 * 0.001 - penalty,
                reason: format!("numbered variant ({num}, depth: {depth})"),
            };
        }
    }

    // Query asks for a specific number: flowers2 -> flowers-2.txt or nearby
    if let Some(m) = TRAILING_DIGITS.captures(name).and_then(|c| c.get(1)) {
        let base_without_number = &name[..name.len() - m.as_str().len()];
        if file_name.starts_with(base_without_number) {
            if let (Ok(target), Some(file_number)) =
                (m.as_str().parse::<i64>(), first_dash_number(file_name))
            {
                let diff = (target - file_number).unsigned_abs();
                if diff == 0 {
                    return MatchScore {
                        score: 95.0 - penalty,
                        reason: format!("exact number match ({target}, depth: {depth})"),
                    };
                }
                return MatchScore {
                    score: 85.0 - diff as f64 * 0.1 - penalty,
                    reason: format!("number near match ({file_number}, depth: {depth})"),
                };
            }
        }
    }

    if stem.starts_with(name) {
        return MatchScore {
            score: 50.0 - penalty,
            reason: format!("prefix match (depth: {depth})"),
        };
    }

    if stem.contains(name) {
        return MatchScore {
            score: 40.0 - penalty,
            reason: format!("contains match (depth: {depth})"),
        };
    }

    MatchScore::none()
}

fn first_dash_number(file_name: &str) -> Option<i64> {
    DASH_NUMBER
        .captures(file_name)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Rank every candidate against the query, best first.
///
/// The sort is stable: candidates tying on score keep their input order, so
/// results are reproducible for a fixed candidate list.
pub fn rank_matches<'a>(
    query: &str,
    candidates: &'a [PathBuf],
    search_roots: &[PathBuf],
) -> Vec<(&'a Path, MatchScore)> {
    let mut matches: Vec<(&Path, MatchScore)> = candidates
        .iter()
        .map(|c| {
            let root = SearchRoots::owning_root(search_roots, c);
            (c.as_path(), score_filename_match(query, c, root))
        })
        .filter(|(_, m)| m.score > 0.0)
        .collect();

    matches.sort_by(|a, b| b.1.score.partial_cmp(&a.1.score).unwrap_or(std::cmp::Ordering::Equal));
    matches
}

/// Find the single best-scoring candidate for `query`, or `None` if nothing
/// scores above zero. Pure: no caches touched, no filesystem access.
pub fn find_best_match<'a>(
    query: &str,
    candidates: &'a [PathBuf],
    search_roots: &[PathBuf],
) -> Option<&'a Path> {
    let matches = rank_matches(query, candidates, search_roots);

    if tracing::enabled!(tracing::Level::DEBUG) {
        debug!("candidates for '{query}' (sorted by relevance):");
        for (path, m) in &matches {
            debug!("  {:<60} : {:>7.3} ({})", path.display(), m.score, m.reason);
        }
        match matches.first() {
            Some((path, _)) => debug!("selected: {}", path.display()),
            None => debug!("no matching files found"),
        }
    }

    matches.first().map(|(path, _)| *path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(specs: &[&str]) -> Vec<PathBuf> {
        specs.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn exact_stem_beats_deeper_exact_stem() {
        let candidates = paths(&["colors/red.txt", "red.txt"]);
        let best = find_best_match("red", &candidates, &[]).unwrap();
        assert_eq!(best, Path::new("red.txt"));
    }

    #[test]
    fn perfect_path_match_wins() {
        let candidates = paths(&["red.txt", "colors/red.txt"]);
        let best = find_best_match("colors/red.txt", &candidates, &[]).unwrap();
        assert_eq!(best, Path::new("colors/red.txt"));
    }

    #[test]
    fn query_extension_is_ignored_for_stem_match() {
        let candidates = paths(&["red.txt"]);
        let best = find_best_match("red.txt", &candidates, &[]).unwrap();
        assert_eq!(best, Path::new("red.txt"));
    }

    #[test]
    fn base_version_match_for_numbered_query() {
        let candidates = paths(&["flowers.txt"]);
        let best = find_best_match("flowers2", &candidates, &[]).unwrap();
        assert_eq!(best, Path::new("flowers.txt"));
    }

    #[test]
    fn exact_number_match_beats_base_version() {
        let candidates = paths(&["flowers.txt", "flowers-2.txt"]);
        let best = find_best_match("flowers2", &candidates, &[]).unwrap();
        assert_eq!(best, Path::new("flowers-2.txt"));
    }

    #[test]
    fn numbered_variant_for_plain_query_loses_to_exact() {
        let candidates = paths(&["flowers-2.txt", "flowers.txt"]);
        let best = find_best_match("flowers", &candidates, &[]).unwrap();
        assert_eq!(best, Path::new("flowers.txt"));
    }

    #[test]
    fn numbered_variant_picked_when_no_exact_exists() {
        let candidates = paths(&["flowers-3.txt", "roses.txt"]);
        let best = find_best_match("flowers", &candidates, &[]).unwrap();
        assert_eq!(best, Path::new("flowers-3.txt"));
    }

    #[test]
    fn prefix_beats_contains() {
        let candidates = paths(&["wildflowers.txt", "flowerpots.txt"]);
        let best = find_best_match("flower", &candidates, &[]).unwrap();
        // "flowerpots" starts with the query, "wildflowers" only contains it
        assert_eq!(best, Path::new("flowerpots.txt"));
    }

    #[test]
    fn empty_candidates_is_none() {
        assert!(find_best_match("red", &[], &[]).is_none());
    }

    #[test]
    fn unrelated_candidates_score_zero() {
        let candidates = paths(&["animals.txt"]);
        assert!(find_best_match("red", &candidates, &[]).is_none());
    }

    #[test]
    fn stable_order_breaks_score_ties() {
        // Identical file names in two sibling directories tie exactly;
        // the first candidate in input order must win.
        let roots = paths(&["a", "b"]);
        let candidates = paths(&["b/red.txt", "a/red.txt"]);
        let best = find_best_match("red", &candidates, &roots).unwrap();
        assert_eq!(best, Path::new("b/red.txt"));
    }

    #[test]
    fn depth_relative_to_owning_root() {
        let roots = paths(&["w"]);
        let shallow = score_filename_match("red", Path::new("w/red.txt"), Some(Path::new("w")));
        let deep =
            score_filename_match("red", Path::new("w/colors/red.txt"), Some(Path::new("w")));
        assert!(shallow.score > deep.score);
    }
}
