//! Labelled options produced by an options source.

use serde::{Deserialize, Serialize};

/// A labelled value offered by an options source.
///
/// Options are immutable once produced. Two options refer to the same
/// selection entry when their [`key`](Self::key)s are equal: the value if
/// present, otherwise the label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOption<V> {
    /// Display text, also used for matching and inline completion.
    pub label: String,
    /// Addressable value, if any.
    #[serde(default)]
    pub value: Option<V>,
    /// Free-form data carried through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

/// Identity of an option within a selection.
#[derive(Debug, PartialEq, Eq, Hash)]
pub enum OptionKey<'a, V> {
    /// The option carries a value.
    Value(&'a V),
    /// The option has no value and is identified by its label.
    Label(&'a str),
}

impl<V> SearchOption<V> {
    /// Create an option with a label and no value.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: None,
            meta: None,
        }
    }

    /// Create an option with a label and a value.
    pub fn with_value(label: impl Into<String>, value: V) -> Self {
        Self {
            label: label.into(),
            value: Some(value),
            meta: None,
        }
    }

    /// Attach metadata.
    pub fn meta(mut self, meta: serde_json::Value) -> Self {
        self.meta = Some(meta);
        self
    }

    /// The identity of this option (`value`, falling back to `label`).
    pub fn key(&self) -> OptionKey<'_, V> {
        match &self.value {
            Some(value) => OptionKey::Value(value),
            None => OptionKey::Label(&self.label),
        }
    }
}

impl<V: PartialEq> SearchOption<V> {
    /// Check if both options refer to the same selection entry.
    pub fn same_entry(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

/// Conversion from host items into [`SearchOption`]s.
///
/// # Example
///
/// ```
/// use quarry::option::{OptionItem, SearchOption};
///
/// let option: SearchOption<u32> = (7, "Seven").into_option();
/// assert_eq!(option.label, "Seven");
/// assert_eq!(option.value, Some(7));
/// ```
pub trait OptionItem<V> {
    /// Convert this item into an option.
    fn into_option(self) -> SearchOption<V>;
}

impl<V> OptionItem<V> for SearchOption<V> {
    fn into_option(self) -> SearchOption<V> {
        self
    }
}

impl<V> OptionItem<V> for String {
    fn into_option(self) -> SearchOption<V> {
        SearchOption::new(self)
    }
}

impl<V> OptionItem<V> for &str {
    fn into_option(self) -> SearchOption<V> {
        SearchOption::new(self)
    }
}

// (value, label) tuples
impl<V, S> OptionItem<V> for (V, S)
where
    S: Into<String>,
{
    fn into_option(self) -> SearchOption<V> {
        SearchOption::with_value(self.1, self.0)
    }
}

/// Convert a collection of host items into options.
pub fn options<V, I>(items: I) -> Vec<SearchOption<V>>
where
    I: IntoIterator,
    I::Item: OptionItem<V>,
{
    items.into_iter().map(OptionItem::into_option).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_prefers_value() {
        let with_value = SearchOption::with_value("Apple", 1);
        let label_only: SearchOption<i32> = SearchOption::new("Apple");
        assert_eq!(with_value.key(), OptionKey::Value(&1));
        assert_eq!(label_only.key(), OptionKey::Label("Apple"));
    }

    #[test]
    fn test_same_entry() {
        let a = SearchOption::with_value("Apple", 1);
        let renamed = SearchOption::with_value("Green apple", 1);
        let other = SearchOption::with_value("Apple", 2);
        assert!(a.same_entry(&renamed));
        assert!(!a.same_entry(&other));

        let x: SearchOption<i32> = SearchOption::new("x");
        assert!(x.same_entry(&SearchOption::new("x")));
        assert!(!x.same_entry(&SearchOption::with_value("x", 0)));
    }

    #[test]
    fn test_options_from_items() {
        let from_strs: Vec<SearchOption<()>> = options(["a", "b"]);
        assert_eq!(from_strs.len(), 2);
        assert_eq!(from_strs[1].label, "b");
        assert!(from_strs[1].value.is_none());

        let from_pairs = options([("us", "United States"), ("ca", "Canada")]);
        assert_eq!(from_pairs[1].value, Some("ca"));
        assert_eq!(from_pairs[1].label, "Canada");
    }

    #[test]
    fn test_deserialize_without_value() {
        let option: SearchOption<u32> =
            serde_json::from_str(r#"{"label": "Option 1"}"#).expect("valid option json");
        assert_eq!(option.label, "Option 1");
        assert!(option.value.is_none());
        assert!(option.meta.is_none());
    }
}
