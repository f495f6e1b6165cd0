//! Resolving a debounced query into a result set.
//!
//! [`OptionsResolver`] is a plain state machine. It decides what a query
//! needs (a synchronous static match, a seed list, or an async provider
//! call tagged with a sequence number) and accepts provider responses only
//! for the latest sequence number. Driving the provider future is left to
//! the caller; see [`SearchSession`](crate::session::SearchSession).

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::SearchConfig;
use crate::error::{ProviderError, SearchError};
use crate::filter::{MatchRule, filter_options};
use crate::option::SearchOption;

/// Asynchronous options lookup.
#[async_trait]
pub trait OptionsProvider<V>: Send + Sync {
    /// Return the options matching `query`, best first.
    async fn search(&self, query: &str) -> Result<Vec<SearchOption<V>>, ProviderError>;
}

/// Adapts an async closure into an [`OptionsProvider`].
pub struct FnProvider<F> {
    f: F,
}

impl<F> FnProvider<F> {
    /// Wrap `f`.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<V, F, Fut> OptionsProvider<V> for FnProvider<F>
where
    V: Send + 'static,
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<SearchOption<V>>, ProviderError>> + Send + 'static,
{
    async fn search(&self, query: &str) -> Result<Vec<SearchOption<V>>, ProviderError> {
        (self.f)(query.to_string()).await
    }
}

/// Where options come from.
pub enum OptionsSource<V> {
    /// A fixed list, matched synchronously.
    Static(Vec<SearchOption<V>>),
    /// An async lookup.
    Provider(Arc<dyn OptionsProvider<V>>),
}

impl<V> OptionsSource<V> {
    /// A static list.
    pub fn list(options: Vec<SearchOption<V>>) -> Self {
        Self::Static(options)
    }

    /// An async provider.
    pub fn provider(provider: impl OptionsProvider<V> + 'static) -> Self {
        Self::Provider(Arc::new(provider))
    }

    /// An async closure `(query) -> Result<options, error>`.
    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        V: Send + 'static,
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<SearchOption<V>>, ProviderError>> + Send + 'static,
    {
        Self::Provider(Arc::new(FnProvider::new(f)))
    }
}

impl<V: Clone> Clone for OptionsSource<V> {
    fn clone(&self) -> Self {
        match self {
            Self::Static(options) => Self::Static(options.clone()),
            Self::Provider(provider) => Self::Provider(Arc::clone(provider)),
        }
    }
}

impl<V> std::fmt::Debug for OptionsSource<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static(options) => f.debug_tuple("Static").field(&options.len()).finish(),
            Self::Provider(_) => f.debug_tuple("Provider").finish_non_exhaustive(),
        }
    }
}

/// Observable state of a search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchState<V> {
    /// Query the current results (or in-flight request) belong to.
    pub debounced_query: String,
    /// True while the latest provider request is outstanding.
    pub loading: bool,
    /// Results of the latest completed, non-superseded resolution.
    pub results: Vec<SearchOption<V>>,
    /// Rejection of the latest request, if it failed.
    pub error: Option<SearchError>,
    /// Bumped every time `results` is replaced.
    pub revision: u64,
}

impl<V> Default for SearchState<V> {
    fn default() -> Self {
        Self {
            debounced_query: String::new(),
            loading: false,
            results: Vec::new(),
            error: None,
            revision: 0,
        }
    }
}

/// What [`OptionsResolver::begin`] needs the caller to do.
pub enum Resolution<V> {
    /// Results were produced synchronously.
    Ready,
    /// Run `provider.search(query)` and feed the outcome to
    /// [`OptionsResolver::on_response`] with `seq`.
    Fetch {
        /// Sequence number of this request.
        seq: u64,
        /// Query to search for.
        query: String,
        /// Provider to call.
        provider: Arc<dyn OptionsProvider<V>>,
    },
}

impl<V> std::fmt::Debug for Resolution<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready => f.write_str("Ready"),
            Self::Fetch { seq, query, .. } => f
                .debug_struct("Fetch")
                .field("seq", seq)
                .field("query", query)
                .finish_non_exhaustive(),
        }
    }
}

/// Turns debounced queries into results, discarding superseded responses.
#[derive(Debug)]
pub struct OptionsResolver<V> {
    source: OptionsSource<V>,
    initial_options: Option<Vec<SearchOption<V>>>,
    match_rule: MatchRule,
    min_search_length: usize,
    state: SearchState<V>,
    /// Sequence number of the latest issued (or invalidated) request.
    sequence: u64,
}

impl<V: Clone> OptionsResolver<V> {
    /// Create a resolver for `source`.
    pub fn new(source: OptionsSource<V>, config: &SearchConfig) -> Self {
        Self {
            source,
            initial_options: None,
            match_rule: config.match_rule,
            min_search_length: config.min_search_length,
            state: SearchState::default(),
            sequence: 0,
        }
    }

    /// Seed list shown for an empty query instead of searching.
    pub fn with_initial_options(mut self, options: Vec<SearchOption<V>>) -> Self {
        self.initial_options = Some(options);
        self
    }

    /// Current state.
    pub fn state(&self) -> &SearchState<V> {
        &self.state
    }

    /// Sequence number of the latest request.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Start resolving `query`.
    ///
    /// Any request still in flight becomes stale.
    pub fn begin(&mut self, query: &str) -> Resolution<V> {
        self.sequence += 1;
        self.state.debounced_query = query.to_owned();

        if query.is_empty() {
            if let Some(seed) = &self.initial_options {
                let seed = seed.clone();
                self.finish(seed);
                return Resolution::Ready;
            }
            if self.min_search_length > 0 {
                self.finish(Vec::new());
                return Resolution::Ready;
            }
        }

        match &self.source {
            OptionsSource::Static(options) => {
                let results = filter_options(self.match_rule, query, options);
                self.finish(results);
                Resolution::Ready
            }
            OptionsSource::Provider(provider) => {
                let provider = Arc::clone(provider);
                self.state.loading = true;
                log::debug!("dispatching search #{} for {:?}", self.sequence, query);
                Resolution::Fetch {
                    seq: self.sequence,
                    query: query.to_owned(),
                    provider,
                }
            }
        }
    }

    /// Apply the outcome of request `seq`.
    ///
    /// Returns false (and changes nothing) if `seq` has been superseded or
    /// stopped. A rejection keeps the previous results.
    pub fn on_response(
        &mut self,
        seq: u64,
        result: Result<Vec<SearchOption<V>>, ProviderError>,
    ) -> bool {
        if seq != self.sequence {
            log::trace!("discarding stale response #{seq} (latest #{})", self.sequence);
            return false;
        }
        match result {
            Ok(results) => self.finish(results),
            Err(err) => {
                self.state.loading = false;
                self.state.error = Some(err.into());
            }
        }
        true
    }

    /// Invalidate the in-flight request and clear `loading`.
    ///
    /// Safe to call when nothing is in flight.
    pub fn stop(&mut self) {
        self.sequence += 1;
        self.state.loading = false;
    }

    /// Clear the last error.
    pub fn clear_error(&mut self) {
        self.state.error = None;
    }

    /// Replace the options source and reset the search state.
    pub fn set_source(&mut self, source: OptionsSource<V>) {
        self.source = source;
        self.state.error = None;
        self.reset();
    }

    /// Drop the results and invalidate the in-flight request.
    pub fn reset(&mut self) {
        self.stop();
        self.state.debounced_query.clear();
        if !self.state.results.is_empty() {
            self.state.results.clear();
            self.state.revision += 1;
        }
    }

    fn finish(&mut self, results: Vec<SearchOption<V>>) {
        self.state.loading = false;
        self.state.error = None;
        self.state.results = results;
        self.state.revision += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::option::options;

    fn fruit() -> Vec<SearchOption<()>> {
        options(["Apple", "Apricot", "Banana"])
    }

    fn provider_source() -> OptionsSource<()> {
        OptionsSource::from_fn(|_query| async { Ok::<_, ProviderError>(Vec::new()) })
    }

    fn labels(state: &SearchState<()>) -> Vec<&str> {
        state.results.iter().map(|o| o.label.as_str()).collect()
    }

    fn expect_fetch(resolution: Resolution<()>) -> u64 {
        match resolution {
            Resolution::Fetch { seq, .. } => seq,
            Resolution::Ready => panic!("expected a fetch"),
        }
    }

    #[test]
    fn test_static_source_is_synchronous() {
        let mut resolver =
            OptionsResolver::new(OptionsSource::list(fruit()), &SearchConfig::default());
        assert!(matches!(resolver.begin("ap"), Resolution::Ready));
        assert!(!resolver.state().loading);
        assert_eq!(labels(resolver.state()), vec!["Apple", "Apricot"]);
    }

    #[test]
    fn test_stale_response_is_discarded() {
        let mut resolver = OptionsResolver::new(provider_source(), &SearchConfig::default());
        let slow = expect_fetch(resolver.begin("a"));
        let fast = expect_fetch(resolver.begin("ab"));
        assert!(resolver.state().loading);

        assert!(resolver.on_response(fast, Ok(options(["Abba"]))));
        assert!(!resolver.state().loading);
        assert!(!resolver.on_response(slow, Ok(options(["Apple", "Avocado"]))));
        assert_eq!(labels(resolver.state()), vec!["Abba"]);
    }

    #[test]
    fn test_loading_until_latest_resolves() {
        let mut resolver = OptionsResolver::new(provider_source(), &SearchConfig::default());
        let first = expect_fetch(resolver.begin("a"));
        let second = expect_fetch(resolver.begin("ab"));
        assert!(!resolver.on_response(first, Ok(options(["A"]))));
        assert!(resolver.state().loading);
        assert!(resolver.on_response(second, Ok(options(["Ab"]))));
        assert!(!resolver.state().loading);
    }

    #[test]
    fn test_rejection_keeps_results() {
        let mut resolver = OptionsResolver::new(provider_source(), &SearchConfig::default());
        let seq = expect_fetch(resolver.begin("a"));
        resolver.on_response(seq, Ok(options(["Apple"])));

        let seq = expect_fetch(resolver.begin("ap"));
        resolver.on_response(seq, Err(ProviderError::reason("offline")));
        assert_eq!(resolver.state().error, Some(SearchError::Reason("offline".into())));
        assert!(!resolver.state().loading);
        assert_eq!(labels(resolver.state()), vec!["Apple"]);

        let seq = expect_fetch(resolver.begin("apx"));
        resolver.on_response(
            seq,
            Err(ProviderError::other(std::io::Error::other("boom"))),
        );
        assert_eq!(resolver.state().error, Some(SearchError::Failed));

        // next success clears the error
        let seq = expect_fetch(resolver.begin("app"));
        resolver.on_response(seq, Ok(options(["Apple"])));
        assert_eq!(resolver.state().error, None);
    }

    #[test]
    fn test_stop_invalidates_in_flight() {
        let mut resolver = OptionsResolver::new(provider_source(), &SearchConfig::default());
        let seq = expect_fetch(resolver.begin("a"));
        resolver.stop();
        assert!(!resolver.state().loading);
        assert!(!resolver.on_response(seq, Ok(options(["Apple"]))));
        assert!(resolver.state().results.is_empty());

        // idempotent
        resolver.stop();
        resolver.stop();
        assert!(!resolver.state().loading);
    }

    #[test]
    fn test_initial_options_bypass_provider() {
        let mut resolver = OptionsResolver::new(provider_source(), &SearchConfig::default())
            .with_initial_options(options(["Recent 1", "Recent 2"]));
        assert!(matches!(resolver.begin(""), Resolution::Ready));
        assert_eq!(labels(resolver.state()), vec!["Recent 1", "Recent 2"]);
        assert!(matches!(resolver.begin("r"), Resolution::Fetch { .. }));
    }

    #[test]
    fn test_empty_query_without_seed() {
        let mut resolver =
            OptionsResolver::new(OptionsSource::list(fruit()), &SearchConfig::default());
        resolver.begin("ap");
        resolver.begin("");
        assert!(resolver.state().results.is_empty());

        let config = SearchConfig::default().with_min_search_length(0);
        let mut resolver = OptionsResolver::new(OptionsSource::list(fruit()), &config);
        resolver.begin("");
        assert_eq!(resolver.state().results.len(), 3);

        let mut resolver = OptionsResolver::new(provider_source(), &config);
        assert!(matches!(resolver.begin(""), Resolution::Fetch { .. }));
    }

    #[test]
    fn test_set_source_resets() {
        let mut resolver = OptionsResolver::new(provider_source(), &SearchConfig::default());
        let seq = expect_fetch(resolver.begin("a"));
        resolver.on_response(seq, Ok(options(["Apple"])));
        let pending = expect_fetch(resolver.begin("ap"));

        resolver.set_source(OptionsSource::list(fruit()));
        assert!(!resolver.state().loading);
        assert!(resolver.state().results.is_empty());
        assert!(!resolver.on_response(pending, Ok(options(["Apple"]))));
    }

    #[test]
    fn test_reset_keeps_error() {
        let mut resolver = OptionsResolver::new(provider_source(), &SearchConfig::default());
        let seq = expect_fetch(resolver.begin("a"));
        resolver.on_response(seq, Ok(options(["Apple"])));
        let seq = expect_fetch(resolver.begin("ap"));
        resolver.on_response(seq, Err(ProviderError::reason("offline")));
        let revision = resolver.state().revision;

        resolver.reset();
        assert!(resolver.state().results.is_empty());
        assert_eq!(resolver.state().debounced_query, "");
        assert_eq!(resolver.state().revision, revision + 1);
        assert!(resolver.state().error.is_some());

        resolver.reset();
        assert_eq!(resolver.state().revision, revision + 1);
    }
}
