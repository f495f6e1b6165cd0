//! Inline (ghost-text) completion.
//!
//! When the top (or highlighted) result starts with the query, its label
//! replaces the visible text and the part the user did not type is selected,
//! so the next keystroke overwrites it.

use std::ops::Range;

use crate::option::SearchOption;

/// Keys the completion engine and session react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Backspace,
    Delete,
    Enter,
    Escape,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    Tab,
}

/// A completion to apply to the input.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion<V> {
    /// The candidate to commit as the selected value.
    pub option: SearchOption<V>,
    /// New visible text (the candidate's label).
    pub text: String,
    /// Byte range of `text` that was suggested rather than typed.
    pub selection: Range<usize>,
}

/// Compute the completion of `query` against `candidate`.
///
/// The candidate's label must start with `query`, compared case-insensitively
/// per character, and extend past it. The selection starts after the matched
/// prefix of the label.
pub fn complete_against<V: Clone>(
    query: &str,
    candidate: &SearchOption<V>,
) -> Option<Completion<V>> {
    if query.is_empty() {
        return None;
    }
    let label = &candidate.label;
    let mut label_chars = label.char_indices();
    let mut start = 0;
    for typed in query.chars() {
        let (index, suggested) = label_chars.next()?;
        if !chars_eq_ignore_case(typed, suggested) {
            return None;
        }
        start = index + suggested.len_utf8();
    }
    if start >= label.len() {
        return None;
    }
    Some(Completion {
        option: candidate.clone(),
        text: label.clone(),
        selection: start..label.len(),
    })
}

fn chars_eq_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// Decides when inline completion runs.
///
/// Results-driven completion runs once per `(debounced query, results
/// revision)` pair. A recorded `Backspace` suppresses completion until any
/// other key is recorded.
#[derive(Debug, Clone)]
pub struct CompletionEngine {
    auto_select: bool,
    last_key: Option<Key>,
    last_seen: Option<(String, u64)>,
}

impl CompletionEngine {
    /// Create an engine.
    pub fn new(auto_select: bool) -> Self {
        Self {
            auto_select,
            last_key: None,
            last_seen: None,
        }
    }

    /// Whether completion is enabled at all.
    pub fn auto_select(&self) -> bool {
        self.auto_select
    }

    /// Record the last key pressed in the input.
    pub fn record_key(&mut self, key: Key) {
        self.last_key = Some(key);
    }

    /// Whether the last recorded key suppresses completion.
    pub fn is_suppressed(&self) -> bool {
        self.last_key == Some(Key::Backspace)
    }

    /// Forget the last seen query/results pair.
    pub fn reset(&mut self) {
        self.last_seen = None;
    }

    /// Called when the debounced query or the results change.
    pub fn on_results<V: Clone>(
        &mut self,
        debounced_query: &str,
        results: &[SearchOption<V>],
        revision: u64,
    ) -> Option<Completion<V>> {
        if let Some((query, seen)) = &self.last_seen
            && query == debounced_query
            && *seen == revision
        {
            return None;
        }
        self.last_seen = Some((debounced_query.to_owned(), revision));

        if !self.auto_select || debounced_query.is_empty() || self.is_suppressed() {
            return None;
        }
        complete_against(debounced_query, results.first()?)
    }

    /// Called when the highlighted result changes.
    pub fn on_navigate<V: Clone>(
        &mut self,
        query: &str,
        results: &[SearchOption<V>],
        active_index: Option<usize>,
    ) -> Option<Completion<V>> {
        let index = active_index?;
        if !self.auto_select || self.is_suppressed() {
            return None;
        }
        complete_against(query, results.get(index)?)
    }
}

impl Default for CompletionEngine {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::option::options;

    fn results() -> Vec<SearchOption<()>> {
        options(["Option 1", "Option 2"])
    }

    #[test]
    fn test_suffix_range() {
        let completion = complete_against("opt", &SearchOption::<()>::new("Option 1"))
            .expect("prefix matches");
        assert_eq!(completion.text, "Option 1");
        assert_eq!(completion.selection, 3..8);
        assert_eq!(completion.option.label, "Option 1");
    }

    #[test]
    fn test_no_completion_without_prefix() {
        assert!(complete_against("tion", &SearchOption::<()>::new("Option 1")).is_none());
        let label = SearchOption::<()>::new("Option 1");
        assert!(complete_against("Option 1 and more", &label).is_none());
    }

    #[test]
    fn test_no_completion_for_exact_match() {
        assert!(complete_against("option 1", &SearchOption::<()>::new("Option 1")).is_none());
    }

    #[test]
    fn test_multibyte_offsets() {
        let completion = complete_against("é", &SearchOption::<()>::new("Éclair"))
            .expect("case-insensitive prefix");
        assert_eq!(completion.selection, "É".len().."Éclair".len());
    }

    #[test]
    fn test_results_change_detection() {
        let mut engine = CompletionEngine::new(true);
        let results = results();
        assert!(engine.on_results("opt", &results, 1).is_some());
        assert!(engine.on_results("opt", &results, 1).is_none());
        assert!(engine.on_results("opt", &results, 2).is_some());
    }

    #[test]
    fn test_backspace_suppression() {
        let mut engine = CompletionEngine::new(true);
        let results = results();
        engine.record_key(Key::Backspace);
        assert!(engine.on_results("op", &results, 1).is_none());
        assert!(engine.on_results("o", &results, 2).is_none());

        engine.record_key(Key::Char('p'));
        assert!(engine.on_results("op", &results, 3).is_some());
    }

    #[test]
    fn test_suppressed_cycle_is_still_consumed() {
        let mut engine = CompletionEngine::new(true);
        let results = results();
        engine.record_key(Key::Backspace);
        assert!(engine.on_results("op", &results, 1).is_none());
        engine.record_key(Key::Char('x'));
        // same pair as the suppressed cycle: no retroactive completion
        assert!(engine.on_results("op", &results, 1).is_none());
    }

    #[test]
    fn test_navigation_uses_active_index() {
        let mut engine = CompletionEngine::new(true);
        let results = results();
        let completion = engine
            .on_navigate("opt", &results, Some(1))
            .expect("second option matches");
        assert_eq!(completion.text, "Option 2");
        assert!(engine.on_navigate("opt", &results, None).is_none());
        assert!(engine.on_navigate("opt", &results, Some(5)).is_none());
    }

    #[test]
    fn test_disabled() {
        let mut engine = CompletionEngine::new(false);
        let results = results();
        assert!(engine.on_results("opt", &results, 1).is_none());
        assert!(engine.on_navigate("opt", &results, Some(0)).is_none());
    }
}
