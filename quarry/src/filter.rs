//! Label matching for static option lists.

use nucleo_matcher::pattern::{AtomKind, CaseMatching, Normalization, Pattern};
use nucleo_matcher::{Config, Matcher, Utf32Str};
use serde::Deserialize;

use crate::option::SearchOption;

/// How a static option list is matched against the query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchRule {
    /// Case-insensitive substring match, list order preserved.
    #[default]
    Substring,
    /// Case-insensitive prefix match, list order preserved.
    Prefix,
    /// Fuzzy match, best score first.
    Fuzzy,
}

/// Result of a fuzzy filter operation.
#[derive(Debug, Clone)]
pub struct FilterMatch {
    /// Index of the matched item in the original list.
    pub index: usize,
    /// Match score (higher is better).
    pub score: u32,
}

/// Fuzzy filter using nucleo-matcher.
///
/// Returns matches sorted by score (highest first); equal scores keep their
/// original order. Empty query returns all items with score 0.
pub fn fuzzy_filter<S: AsRef<str>>(query: &str, items: &[S]) -> Vec<FilterMatch> {
    if query.is_empty() {
        return (0..items.len())
            .map(|index| FilterMatch { index, score: 0 })
            .collect();
    }

    let mut matcher = Matcher::new(Config::DEFAULT);
    let pattern = Pattern::new(
        query,
        CaseMatching::Ignore,
        Normalization::Smart,
        AtomKind::Fuzzy,
    );

    let mut buf = Vec::new();
    let mut matches: Vec<FilterMatch> = items
        .iter()
        .enumerate()
        .filter_map(|(index, label)| {
            let haystack = Utf32Str::new(label.as_ref(), &mut buf);
            pattern
                .score(haystack, &mut matcher)
                .map(|score| FilterMatch { index, score })
        })
        .collect();

    // sort_by is stable, ties stay in list order
    matches.sort_by(|a, b| b.score.cmp(&a.score));

    matches
}

/// Filter `options` by `query` according to `rule`.
///
/// An empty query returns the list unchanged.
pub fn filter_options<V: Clone>(
    rule: MatchRule,
    query: &str,
    options: &[SearchOption<V>],
) -> Vec<SearchOption<V>> {
    if query.is_empty() {
        return options.to_vec();
    }

    match rule {
        MatchRule::Substring => {
            let needle = query.to_lowercase();
            options
                .iter()
                .filter(|option| option.label.to_lowercase().contains(&needle))
                .cloned()
                .collect()
        }
        MatchRule::Prefix => {
            let needle = query.to_lowercase();
            options
                .iter()
                .filter(|option| option.label.to_lowercase().starts_with(&needle))
                .cloned()
                .collect()
        }
        MatchRule::Fuzzy => {
            let labels: Vec<&str> = options.iter().map(|o| o.label.as_str()).collect();
            fuzzy_filter(query, &labels)
                .into_iter()
                .map(|m| options[m.index].clone())
                .collect()
        }
    }
}
