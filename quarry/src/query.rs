//! Live and debounced query tracking.

use std::time::Duration;

use crate::config::SearchConfig;

/// What the caller must do after a live query update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryChange {
    /// The query did not change.
    Unchanged,
    /// The query was cleared; the debounced query is already empty.
    Cleared {
        /// Whether the debounced query was non-empty before.
        was_searching: bool,
    },
    /// (Re)start the debounce timer and call
    /// [`settle`](QueryPipeline::settle) with this generation when it fires.
    Pending {
        /// Generation that must still be current when the timer fires.
        generation: u64,
    },
}

/// Tracks the live query and commits it as the debounced query after a
/// quiet period.
///
/// The pipeline is timer-agnostic: every keystroke bumps a generation, and
/// a timer only commits if its generation is still the latest. Clearing the
/// query commits immediately.
#[derive(Debug, Clone)]
pub struct QueryPipeline {
    live: String,
    debounced: String,
    generation: u64,
    debounce_threshold: Duration,
    min_search_length: usize,
}

impl QueryPipeline {
    /// Create a pipeline.
    pub fn new(debounce_threshold: Duration, min_search_length: usize) -> Self {
        Self {
            live: String::new(),
            debounced: String::new(),
            generation: 0,
            debounce_threshold,
            min_search_length,
        }
    }

    /// Create a pipeline from a session config.
    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(config.debounce_threshold, config.min_search_length)
    }

    /// The query as typed.
    pub fn live(&self) -> &str {
        &self.live
    }

    /// The query that drives searching.
    pub fn debounced(&self) -> &str {
        &self.debounced
    }

    /// Generation of the latest live update.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// How long the live query must stay unchanged before it is committed.
    pub fn debounce_threshold(&self) -> Duration {
        self.debounce_threshold
    }

    /// Minimum query length (in characters) before searching.
    pub fn min_search_length(&self) -> usize {
        self.min_search_length
    }

    /// Check if `query` passes the minimum length gate.
    pub fn meets_min_length(&self, query: &str) -> bool {
        query.chars().count() >= self.min_search_length
    }

    /// Record a keystroke.
    pub fn set_query(&mut self, query: &str) -> QueryChange {
        if query == self.live {
            return QueryChange::Unchanged;
        }
        self.live.clear();
        self.live.push_str(query);
        self.generation += 1;

        if query.is_empty() {
            let was_searching = !self.debounced.is_empty();
            self.debounced.clear();
            return QueryChange::Cleared { was_searching };
        }
        QueryChange::Pending {
            generation: self.generation,
        }
    }

    /// Commit the live query when the timer for `generation` fires.
    ///
    /// Returns the new debounced query if it changed. A generation that has
    /// been superseded commits nothing. Queries shorter than the minimum
    /// length clear the debounced query.
    pub fn settle(&mut self, generation: u64) -> Option<&str> {
        if generation != self.generation {
            return None;
        }
        let next = if self.meets_min_length(&self.live) {
            self.live.as_str()
        } else {
            ""
        };
        if next == self.debounced {
            return None;
        }
        self.debounced = next.to_owned();
        Some(&self.debounced)
    }

    /// Invalidate any pending timer.
    pub fn cancel(&mut self) {
        self.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline() -> QueryPipeline {
        QueryPipeline::new(Duration::from_millis(500), 1)
    }

    #[test]
    fn test_only_last_generation_settles() {
        let mut p = pipeline();
        let QueryChange::Pending { generation: first } = p.set_query("o") else {
            panic!("expected pending");
        };
        let QueryChange::Pending { generation: second } = p.set_query("op") else {
            panic!("expected pending");
        };
        let QueryChange::Pending { generation: third } = p.set_query("opt") else {
            panic!("expected pending");
        };

        assert_eq!(p.settle(first), None);
        assert_eq!(p.settle(second), None);
        assert_eq!(p.settle(third), Some("opt"));
        // A second fire for the same generation commits nothing.
        assert_eq!(p.settle(third), None);
        assert_eq!(p.debounced(), "opt");
        assert_eq!(p.live(), "opt");
    }

    #[test]
    fn test_clear_is_immediate() {
        let mut p = pipeline();
        let QueryChange::Pending { generation } = p.set_query("abc") else {
            panic!("expected pending");
        };
        p.settle(generation);
        assert_eq!(p.debounced(), "abc");

        let QueryChange::Pending { generation } = p.set_query("ab") else {
            panic!("expected pending");
        };
        assert_eq!(
            p.set_query(""),
            QueryChange::Cleared {
                was_searching: true
            }
        );
        assert_eq!(p.debounced(), "");
        // The timer started for "ab" is stale now.
        assert_eq!(p.settle(generation), None);
        assert_eq!(p.debounced(), "");
    }

    #[test]
    fn test_short_query_clears_debounced() {
        let mut p = QueryPipeline::new(Duration::from_millis(500), 3);
        let QueryChange::Pending { generation } = p.set_query("abcd") else {
            panic!("expected pending");
        };
        assert_eq!(p.settle(generation), Some("abcd"));

        let QueryChange::Pending { generation } = p.set_query("ab") else {
            panic!("expected pending");
        };
        assert_eq!(p.settle(generation), Some(""));
        assert_eq!(p.debounced(), "");
    }

    #[test]
    fn test_unchanged_and_cancel() {
        let mut p = pipeline();
        let QueryChange::Pending { generation } = p.set_query("x") else {
            panic!("expected pending");
        };
        assert_eq!(p.set_query("x"), QueryChange::Unchanged);
        p.cancel();
        assert_eq!(p.settle(generation), None);
        assert_eq!(p.set_query(""), QueryChange::Cleared { was_searching: false });
    }

    #[test]
    fn test_min_length_counts_chars() {
        let p = QueryPipeline::new(Duration::ZERO, 2);
        assert!(!p.meets_min_length("é"));
        assert!(p.meets_min_length("éa"));
    }
}
