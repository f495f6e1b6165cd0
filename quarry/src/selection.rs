//! Controlled/uncontrolled selection state.
//!
//! A [`SelectionController`] owns the selected value of a single- or
//! multi-select widget. The host may inject an external value (controlled
//! mode), which wins for rendering while mutations still flow through the
//! same toggle API and change callback.

use crate::option::SearchOption;

/// Selected value of a single- or multi-select widget.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionValue<V> {
    /// At most one selected option.
    Single(Option<SearchOption<V>>),
    /// Selected options in insertion order.
    Multiple(Vec<SearchOption<V>>),
}

impl<V> SelectionValue<V> {
    /// An empty value for the given mode.
    pub fn empty(multiple: bool) -> Self {
        if multiple {
            Self::Multiple(Vec::new())
        } else {
            Self::Single(None)
        }
    }

    /// Check if nothing is selected.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Single(item) => item.is_none(),
            Self::Multiple(items) => items.is_empty(),
        }
    }

    /// Number of selected options.
    pub fn len(&self) -> usize {
        match self {
            Self::Single(item) => usize::from(item.is_some()),
            Self::Multiple(items) => items.len(),
        }
    }

    /// The selected option in single mode.
    pub fn as_single(&self) -> Option<&SearchOption<V>> {
        match self {
            Self::Single(item) => item.as_ref(),
            Self::Multiple(_) => None,
        }
    }

    /// Selected options as a slice, in either mode.
    pub fn as_slice(&self) -> &[SearchOption<V>] {
        match self {
            Self::Single(item) => item.as_slice(),
            Self::Multiple(items) => items,
        }
    }

    /// Coerce the value into the given mode.
    ///
    /// A single value becomes a one-element list; a list keeps its first element.
    fn into_mode(self, multiple: bool) -> Self {
        match (self, multiple) {
            (Self::Single(item), true) => Self::Multiple(item.into_iter().collect()),
            (Self::Multiple(items), false) => Self::Single(items.into_iter().next()),
            (value, _) => value,
        }
    }
}

impl<V: PartialEq> SelectionValue<V> {
    /// Check if `item` is part of the selection.
    pub fn contains(&self, item: &SearchOption<V>) -> bool {
        self.as_slice().iter().any(|selected| selected.same_entry(item))
    }
}

type ChangeCallback<V> = Box<dyn FnMut(&SelectionValue<V>) + Send>;

/// Reconciles an externally-driven ("controlled") or locally-owned
/// ("uncontrolled") selection.
///
/// The change callback runs after the internal state is written, so the
/// value it receives is the value [`value`](Self::value) returns in
/// uncontrolled mode.
///
/// # Example
///
/// ```
/// use quarry::option::SearchOption;
/// use quarry::selection::{SelectionController, SelectionValue};
///
/// let mut selection = SelectionController::multiple();
/// selection.toggle(Some(SearchOption::with_value("A", 1)), None);
/// selection.toggle(Some(SearchOption::with_value("B", 2)), None);
/// selection.toggle(Some(SearchOption::with_value("A", 1)), None);
/// assert_eq!(selection.value().len(), 1);
/// assert_eq!(selection.value().as_slice()[0].label, "B");
/// ```
pub struct SelectionController<V> {
    multiple: bool,
    controlled: Option<SelectionValue<V>>,
    state: SelectionValue<V>,
    on_change: Option<ChangeCallback<V>>,
}

impl<V> SelectionController<V> {
    /// Create a single-selection controller.
    pub fn single() -> Self {
        Self::new(false)
    }

    /// Create a multi-selection controller.
    pub fn multiple() -> Self {
        Self::new(true)
    }

    fn new(multiple: bool) -> Self {
        Self {
            multiple,
            controlled: None,
            state: SelectionValue::empty(multiple),
            on_change: None,
        }
    }

    /// Seed the internal (uncontrolled) state.
    pub fn with_default(mut self, value: SelectionValue<V>) -> Self {
        self.state = value.into_mode(self.multiple);
        self
    }

    /// Start in controlled mode with an external value.
    pub fn with_value(mut self, value: SelectionValue<V>) -> Self {
        self.controlled = Some(value.into_mode(self.multiple));
        self
    }

    /// Register the change callback.
    ///
    /// The callback receives the new logical value once per successful
    /// mutation.
    pub fn on_change<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&SelectionValue<V>) + Send + 'static,
    {
        self.on_change = Some(Box::new(callback));
        self
    }

    /// Whether this controller holds a list of options.
    pub fn is_multiple(&self) -> bool {
        self.multiple
    }

    /// Whether an external value currently drives the output.
    pub fn is_controlled(&self) -> bool {
        self.controlled.is_some()
    }

    /// Update the external value (call on every host update).
    ///
    /// `None` returns the controller to uncontrolled mode.
    pub fn set_controlled(&mut self, value: Option<SelectionValue<V>>) {
        let multiple = self.multiple;
        self.controlled = value.map(|value| value.into_mode(multiple));
    }

    /// The externally-visible value.
    pub fn value(&self) -> &SelectionValue<V> {
        self.controlled.as_ref().unwrap_or(&self.state)
    }

    fn commit(&mut self, next: SelectionValue<V>) {
        self.state = next;
        if let Some(callback) = self.on_change.as_mut() {
            callback(&self.state);
        }
    }
}

impl<V: Clone + PartialEq> SelectionController<V> {
    /// Toggle `item`, or force its presence with `force`.
    ///
    /// Single mode: selecting the current item clears it, selecting another
    /// replaces it. Multi mode: absent items are appended, present ones
    /// removed. `Some(true)`/`Some(false)` force presence/absence instead.
    ///
    /// `None` is a no-op. Returns true if the value changed.
    pub fn toggle(&mut self, item: Option<SearchOption<V>>, force: Option<bool>) -> bool {
        let Some(item) = item else {
            return false;
        };
        let current = self.value();
        let present = current.contains(&item);
        let want = force.unwrap_or(!present);
        if want == present {
            return false;
        }

        let next = match (current, want) {
            (SelectionValue::Single(_), true) => SelectionValue::Single(Some(item)),
            (SelectionValue::Single(_), false) => SelectionValue::Single(None),
            (SelectionValue::Multiple(items), true) => {
                let mut items = items.clone();
                items.push(item);
                SelectionValue::Multiple(items)
            }
            (SelectionValue::Multiple(items), false) => SelectionValue::Multiple(
                items
                    .iter()
                    .filter(|selected| !selected.same_entry(&item))
                    .cloned()
                    .collect(),
            ),
        };
        self.commit(next);
        true
    }

    /// Ensure `item` is selected.
    pub fn add(&mut self, item: SearchOption<V>) -> bool {
        self.toggle(Some(item), Some(true))
    }

    /// Ensure `item` is not selected.
    pub fn remove(&mut self, item: &SearchOption<V>) -> bool {
        self.toggle(Some(item.clone()), Some(false))
    }

    /// Replace the whole value. No-op if it equals the current value.
    pub fn set_value(&mut self, value: SelectionValue<V>) -> bool {
        let value = value.into_mode(self.multiple);
        if *self.value() == value {
            return false;
        }
        self.commit(value);
        true
    }

    /// Clear the selection. No-op if already empty.
    pub fn clear(&mut self) -> bool {
        if self.value().is_empty() {
            return false;
        }
        self.commit(SelectionValue::empty(self.multiple));
        true
    }

    /// Check if `item` is selected.
    pub fn is_selected(&self, item: &SearchOption<V>) -> bool {
        self.value().contains(item)
    }
}

impl<V: std::fmt::Debug> std::fmt::Debug for SelectionController<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionController")
            .field("multiple", &self.multiple)
            .field("controlled", &self.controlled)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Selection access handed to items that read or mutate shared selection.
///
/// Group items receive this explicitly instead of looking it up from
/// ambient context.
pub trait SelectionContext<V> {
    /// Check if `item` is selected.
    fn is_selected(&self, item: &SearchOption<V>) -> bool;

    /// Toggle `item`; see [`SelectionController::toggle`].
    fn toggle(&mut self, item: Option<SearchOption<V>>, force: Option<bool>) -> bool;
}

impl<V: Clone + PartialEq> SelectionContext<V> for SelectionController<V> {
    fn is_selected(&self, item: &SearchOption<V>) -> bool {
        SelectionController::is_selected(self, item)
    }

    fn toggle(&mut self, item: Option<SearchOption<V>>, force: Option<bool>) -> bool {
        SelectionController::toggle(self, item, force)
    }
}
