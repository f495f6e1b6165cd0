//! Which results panel state to render.

/// Mutually exclusive states of a results panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultsView {
    /// The query is shorter than the minimum search length.
    Instructions,
    /// The query is long enough but the debounced query has not caught up.
    /// Nothing is rendered, to avoid a spinner flashing for fast typers.
    DebounceWaiting,
    /// A search is in flight and there is nothing to show yet.
    Loading,
    /// The debounced search completed without results.
    NoResults,
    /// Results are available (shown even while a newer search loads).
    Results,
}

/// Inputs to [`classify`].
#[derive(Debug, Clone, Copy)]
pub struct PresentationInput<'a> {
    /// Live query.
    pub query: &'a str,
    /// Debounced query.
    pub debounced_query: &'a str,
    /// Whether a search is in flight.
    pub loading: bool,
    /// Number of available results.
    pub result_count: usize,
    /// Minimum query length in characters.
    pub min_search_length: usize,
}

/// Classify the panel state.
///
/// Precedence when several conditions hold: results, loading, no results,
/// debounce waiting, instructions.
pub fn classify(input: &PresentationInput<'_>) -> ResultsView {
    let meets_min = |s: &str| s.chars().count() >= input.min_search_length;

    if input.result_count > 0 {
        ResultsView::Results
    } else if input.loading {
        ResultsView::Loading
    } else if meets_min(input.debounced_query) {
        ResultsView::NoResults
    } else if meets_min(input.query) && input.query != input.debounced_query {
        ResultsView::DebounceWaiting
    } else {
        ResultsView::Instructions
    }
}
