//! Error types

use std::sync::Arc;

use thiserror::Error;

/// Failure returned by an [`OptionsProvider`](crate::resolver::OptionsProvider).
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// The provider rejected the query with a human-readable reason.
    #[error("{0}")]
    Reason(String),

    /// Any other failure.
    #[error(transparent)]
    Other(Arc<dyn std::error::Error + Send + Sync>),
}

impl ProviderError {
    /// Create a rejection with a reason.
    pub fn reason(message: impl Into<String>) -> Self {
        Self::Reason(message.into())
    }

    /// Wrap an arbitrary error.
    pub fn other(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Other(Arc::new(err))
    }
}

impl From<String> for ProviderError {
    fn from(message: String) -> Self {
        Self::Reason(message)
    }
}

impl From<&str> for ProviderError {
    fn from(message: &str) -> Self {
        Self::Reason(message.to_string())
    }
}

impl From<std::io::Error> for ProviderError {
    fn from(err: std::io::Error) -> Self {
        Self::other(err)
    }
}

/// Error exposed on [`SearchState`](crate::resolver::SearchState).
///
/// Provider rejections with a reason keep it; anything else collapses into
/// [`SearchError::Failed`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    /// The provider rejected with this reason.
    #[error("{0}")]
    Reason(String),

    /// The provider failed without a usable reason.
    #[error("search failed")]
    Failed,
}

impl SearchError {
    /// The rejection reason, if the provider gave one.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Reason(reason) => Some(reason),
            Self::Failed => None,
        }
    }
}

impl From<ProviderError> for SearchError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Reason(reason) => Self::Reason(reason),
            ProviderError::Other(_) => Self::Failed,
        }
    }
}

/// Errors that can occur when loading a [`SearchConfig`](crate::config::SearchConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document is not valid TOML or has the wrong shape.
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// `min_search_length` exceeds the supported maximum.
    #[error("min_search_length {value} exceeds maximum of {max}")]
    MinSearchLengthTooLarge {
        /// The configured value.
        value: usize,
        /// The maximum allowed value.
        max: usize,
    },
}
