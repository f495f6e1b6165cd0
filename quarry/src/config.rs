//! Search configuration

use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::ConfigError;
use crate::filter::MatchRule;

/// Largest accepted `min_search_length`.
pub const MAX_MIN_SEARCH_LENGTH: usize = 256;

/// Floor for the delay before a completion's selection range is applied.
const MIN_SELECTION_DELAY: Duration = Duration::from_millis(10);

/// Configuration for a search session.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use quarry::config::SearchConfig;
///
/// let config = SearchConfig::default()
///     .with_debounce_threshold(Duration::from_millis(250))
///     .with_min_search_length(2);
/// assert_eq!(config.selection_delay(), Duration::from_millis(50));
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Quiet period before the live query is committed as the debounced query.
    ///
    /// Default: 500 ms
    #[serde(rename = "debounce_threshold_ms", deserialize_with = "millis")]
    pub debounce_threshold: Duration,

    /// Minimum query length (in characters) before searching.
    ///
    /// Default: 1
    pub min_search_length: usize,

    /// Whether the top match is completed inline as the user types.
    ///
    /// Default: true
    pub auto_select: bool,

    /// How static option lists are matched against the query.
    ///
    /// Default: case-insensitive substring
    pub match_rule: MatchRule,
}

fn millis<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_millis)
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_threshold: Duration::from_millis(500),
            min_search_length: 1,
            auto_select: true,
            match_rule: MatchRule::default(),
        }
    }
}

impl SearchConfig {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and validates a config from a TOML document.
    ///
    /// Missing keys take their default values.
    pub fn from_toml_str(document: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(document)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the config for values the session cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_search_length > MAX_MIN_SEARCH_LENGTH {
            return Err(ConfigError::MinSearchLengthTooLarge {
                value: self.min_search_length,
                max: MAX_MIN_SEARCH_LENGTH,
            });
        }
        Ok(())
    }

    /// Sets the debounce threshold.
    pub fn with_debounce_threshold(mut self, threshold: Duration) -> Self {
        self.debounce_threshold = threshold;
        self
    }

    /// Sets the minimum search length.
    pub fn with_min_search_length(mut self, length: usize) -> Self {
        self.min_search_length = length;
        self
    }

    /// Enables or disables inline completion.
    pub fn with_auto_select(mut self, enabled: bool) -> Self {
        self.auto_select = enabled;
        self
    }

    /// Sets the match rule for static option lists.
    pub fn with_match_rule(mut self, rule: MatchRule) -> Self {
        self.match_rule = rule;
        self
    }

    /// Delay between updating the visible text and applying a completion's
    /// selection range: a fifth of the debounce threshold, at least 10 ms.
    pub fn selection_delay(&self) -> Duration {
        (self.debounce_threshold / 5).max(MIN_SELECTION_DELAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SearchConfig::default();
        assert_eq!(config.debounce_threshold, Duration::from_millis(500));
        assert_eq!(config.min_search_length, 1);
        assert!(config.auto_select);
        assert_eq!(config.match_rule, MatchRule::Substring);
        assert_eq!(config.selection_delay(), Duration::from_millis(100));
    }

    #[test]
    fn test_selection_delay_floor() {
        let config = SearchConfig::new().with_debounce_threshold(Duration::from_millis(20));
        assert_eq!(config.selection_delay(), Duration::from_millis(10));
    }

    #[test]
    fn test_from_toml() {
        let config = SearchConfig::from_toml_str(
            r#"
            debounce_threshold_ms = 300
            match_rule = "fuzzy"
            "#,
        )
        .expect("valid config");
        assert_eq!(config.debounce_threshold, Duration::from_millis(300));
        assert_eq!(config.match_rule, MatchRule::Fuzzy);
        assert_eq!(config.min_search_length, 1);
        assert!(config.auto_select);
    }

    #[test]
    fn test_from_toml_rejects_huge_min_length() {
        let err = SearchConfig::from_toml_str("min_search_length = 1000").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MinSearchLengthTooLarge { value: 1000, .. }
        ));
    }

    #[test]
    fn test_from_toml_parse_error() {
        let err = SearchConfig::from_toml_str("auto_select = \"yes\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
