//! Search session: drives the pipeline on tokio and exposes the read model.
//!
//! A [`SearchSession`] wires the query pipeline, options resolver,
//! completion engine and selection controller together. Keystrokes come in
//! through [`set_query`](SearchSession::set_query) and
//! [`key_pressed`](SearchSession::key_pressed); the debounce timer, provider
//! calls and selection-range requests run as tokio tasks that only hold a
//! weak reference to the session, so dropping the last handle tears
//! everything down.
//!
//! Hosts render from [`snapshot`](SearchSession::snapshot), either polling
//! [`is_dirty`](SearchSession::is_dirty) or waiting on a wakeup channel
//! shared by any number of sessions.

use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::completion::{Completion, CompletionEngine, Key};
use crate::config::SearchConfig;
use crate::debounce::DebounceTimer;
use crate::error::{ProviderError, SearchError};
use crate::option::SearchOption;
use crate::presentation::{PresentationInput, ResultsView, classify};
use crate::query::{QueryChange, QueryPipeline};
use crate::resolver::{OptionsResolver, OptionsSource, Resolution};
use crate::selection::{SelectionContext, SelectionController, SelectionValue};
use crate::wakeup::WakeupSender;

/// Bounds required of option values driven by a session.
pub trait SessionValue: Clone + PartialEq + Send + Sync + 'static {}

impl<T: Clone + PartialEq + Send + Sync + 'static> SessionValue for T {}

/// The text input a session completes into.
pub trait InputHost: Send + Sync {
    /// Replace the visible text.
    fn set_text(&self, text: &str);

    /// Select a byte range of the visible text.
    fn set_selection(&self, range: Range<usize>);
}

/// Unique identifier for a search session.
///
/// Wakeups carry it so a host driving several sessions from one channel
/// knows which snapshot to re-read. Session log lines are prefixed with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(usize);

impl SessionId {
    fn new() -> Self {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        Self(COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "search#{}", self.0)
    }
}

/// Everything a widget needs to render a search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSnapshot<V> {
    /// Live query.
    pub query: String,
    /// Debounced query.
    pub debounced_query: String,
    /// Text the input should show (the query, or a completed label).
    pub display_text: String,
    /// Whether the popover is open.
    pub open: bool,
    /// Whether a provider request is outstanding.
    pub loading: bool,
    /// Current results.
    pub results: Vec<SearchOption<V>>,
    /// Last provider rejection.
    pub error: Option<SearchError>,
    /// Results panel state.
    pub view: ResultsView,
    /// Highlighted result.
    pub active_index: Option<usize>,
    /// Suggested part of `display_text`, if a completion is showing.
    pub completion: Option<Range<usize>>,
    /// Selected value.
    pub value: SelectionValue<V>,
}

impl<V> SearchSnapshot<V> {
    /// Prompt the user to type more.
    pub fn should_show_instructions(&self) -> bool {
        self.view == ResultsView::Instructions
    }

    /// Render nothing while the debounce settles.
    pub fn should_show_debounce_waiting(&self) -> bool {
        self.view == ResultsView::DebounceWaiting
    }

    /// Show a loading indicator.
    pub fn should_show_loading(&self) -> bool {
        self.view == ResultsView::Loading
    }

    /// Show the empty-results message.
    pub fn should_show_no_results(&self) -> bool {
        self.view == ResultsView::NoResults
    }

    /// Results to render (empty unless the view is [`ResultsView::Results`]).
    pub fn display_results(&self) -> &[SearchOption<V>] {
        if self.view == ResultsView::Results {
            &self.results
        } else {
            &[]
        }
    }
}

struct SessionInner<V> {
    config: SearchConfig,
    open: bool,
    /// The current debounced query still has to be resolved.
    stale: bool,
    pipeline: QueryPipeline,
    resolver: OptionsResolver<V>,
    engine: CompletionEngine,
    selection: SelectionController<V>,
    active_index: Option<usize>,
    display_text: String,
    completion: Option<Range<usize>>,
    debounce: DebounceTimer,
    selection_timer: DebounceTimer,
    selection_generation: u64,
}

impl<V: SessionValue> SessionInner<V> {
    /// Drop the pending selection range and ghost text.
    fn supersede_completion(&mut self) {
        self.selection_timer.cancel();
        self.selection_generation += 1;
        self.completion = None;
    }

    fn stop_search(&mut self) {
        if self.resolver.state().loading {
            self.stale = true;
        }
        self.resolver.stop();
    }

    fn close(&mut self) {
        self.open = false;
        self.active_index = None;
        self.stop_search();
    }
}

/// Host calls deferred until the session lock is released.
#[derive(Default)]
struct HostEffects {
    text: Option<String>,
}

struct Shared<V> {
    id: SessionId,
    inner: Mutex<SessionInner<V>>,
    dirty: AtomicBool,
    wakeup: Mutex<Option<WakeupSender>>,
    host: Option<Arc<dyn InputHost>>,
}

impl<V: SessionValue> Shared<V> {
    fn lock(&self) -> MutexGuard<'_, SessionInner<V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark the session dirty. Only the clean-to-dirty edge sends a wakeup.
    fn notify(&self) {
        if self.dirty.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Ok(guard) = self.wakeup.lock()
            && let Some(sender) = guard.as_ref()
        {
            sender.wake(self.id);
        }
    }

    fn apply(&self, effects: HostEffects) {
        if let (Some(host), Some(text)) = (&self.host, effects.text) {
            host.set_text(&text);
        }
    }

    fn set_query(self: &Arc<Self>, query: String) {
        let mut effects = HostEffects::default();
        {
            let mut guard = self.lock();
            let inner = &mut *guard;
            match inner.pipeline.set_query(&query) {
                QueryChange::Unchanged => {
                    if inner.completion.is_none() && inner.display_text == query {
                        return;
                    }
                    // the host deleted the suggested suffix
                    inner.supersede_completion();
                    inner.display_text = query;
                }
                QueryChange::Cleared { .. } => {
                    inner.debounce.cancel();
                    inner.supersede_completion();
                    inner.display_text.clear();
                    if inner.open {
                        self.resolve(inner, &mut effects);
                    } else {
                        inner.resolver.reset();
                        inner.stale = true;
                    }
                }
                QueryChange::Pending { generation } => {
                    inner.supersede_completion();
                    inner.display_text = query;
                    inner.open = true;
                    let weak = Arc::downgrade(self);
                    inner
                        .debounce
                        .schedule(inner.pipeline.debounce_threshold(), move || {
                            if let Some(shared) = weak.upgrade() {
                                shared.settle(generation);
                            }
                        });
                }
            }
        }
        self.notify();
        self.apply(effects);
    }

    fn settle(self: &Arc<Self>, generation: u64) {
        let mut effects = HostEffects::default();
        {
            let mut guard = self.lock();
            let inner = &mut *guard;
            if generation != inner.pipeline.generation() {
                return;
            }
            let changed = inner.pipeline.settle(generation).is_some();
            if changed {
                log::debug!(
                    "{}: debounce settled on {:?}",
                    self.id,
                    inner.pipeline.debounced()
                );
            } else if !inner.stale {
                return;
            }
            if inner.open {
                self.resolve(inner, &mut effects);
            } else {
                inner.stale = true;
            }
        }
        self.notify();
        self.apply(effects);
    }

    fn resolve(self: &Arc<Self>, inner: &mut SessionInner<V>, effects: &mut HostEffects) {
        inner.stale = false;
        inner.active_index = None;
        let query = inner.pipeline.debounced().to_owned();
        match inner.resolver.begin(&query) {
            Resolution::Ready => self.results_changed(inner, effects),
            Resolution::Fetch {
                seq,
                query,
                provider,
            } => {
                let weak = Arc::downgrade(self);
                tokio::spawn(async move {
                    let result = provider.search(&query).await;
                    if let Some(shared) = weak.upgrade() {
                        shared.on_response(seq, result);
                    }
                });
            }
        }
    }

    fn on_response(
        self: &Arc<Self>,
        seq: u64,
        result: Result<Vec<SearchOption<V>>, ProviderError>,
    ) {
        let mut effects = HostEffects::default();
        {
            let mut guard = self.lock();
            let inner = &mut *guard;
            if !inner.resolver.on_response(seq, result) {
                return;
            }
            self.results_changed(inner, &mut effects);
        }
        self.notify();
        self.apply(effects);
    }

    fn results_changed(self: &Arc<Self>, inner: &mut SessionInner<V>, effects: &mut HostEffects) {
        inner.active_index = None;
        if inner.selection.is_multiple() {
            return;
        }
        let state = inner.resolver.state();
        // typing moved on since this query settled; its completion would
        // overwrite the newer keystrokes
        if inner.pipeline.live() != state.debounced_query {
            return;
        }
        let completion = inner
            .engine
            .on_results(&state.debounced_query, &state.results, state.revision);
        if let Some(completion) = completion {
            self.apply_completion(inner, completion, effects);
        }
    }

    fn set_active_index(self: &Arc<Self>, index: Option<usize>) {
        let mut effects = HostEffects::default();
        {
            let mut guard = self.lock();
            let inner = &mut *guard;
            let count = inner.resolver.state().results.len();
            let index = index.filter(|&i| i < count);
            if inner.active_index == index {
                return;
            }
            inner.active_index = index;
            if !inner.selection.is_multiple() {
                let completion = inner.engine.on_navigate(
                    inner.pipeline.live(),
                    &inner.resolver.state().results,
                    index,
                );
                if let Some(completion) = completion {
                    self.apply_completion(inner, completion, &mut effects);
                }
            }
        }
        self.notify();
        self.apply(effects);
    }

    fn apply_completion(
        self: &Arc<Self>,
        inner: &mut SessionInner<V>,
        completion: Completion<V>,
        effects: &mut HostEffects,
    ) {
        let Completion {
            option,
            text,
            selection,
        } = completion;
        inner.selection.toggle(Some(option), Some(true));
        inner.supersede_completion();
        inner.display_text.clone_from(&text);
        inner.completion = Some(selection.clone());
        effects.text = Some(text);

        // The range only exists once the host has rendered the new text.
        let generation = inner.selection_generation;
        let weak = Arc::downgrade(self);
        inner
            .selection_timer
            .schedule(inner.config.selection_delay(), move || {
                if let Some(shared) = weak.upgrade() {
                    shared.deliver_selection(generation, selection);
                }
            });
    }

    fn deliver_selection(&self, generation: u64, range: Range<usize>) {
        if self.lock().selection_generation != generation {
            return;
        }
        if let Some(host) = &self.host {
            host.set_selection(range);
        }
        self.notify();
    }

    fn set_open(self: &Arc<Self>, open: bool) {
        let mut effects = HostEffects::default();
        {
            let mut guard = self.lock();
            let inner = &mut *guard;
            if inner.open == open {
                return;
            }
            if open {
                inner.open = true;
                if inner.stale {
                    self.resolve(inner, &mut effects);
                }
            } else {
                inner.close();
                log::debug!("{}: closed", self.id);
            }
        }
        self.notify();
        self.apply(effects);
    }

    fn select_active(&self) -> bool {
        let mut effects = HostEffects::default();
        {
            let mut guard = self.lock();
            let inner = &mut *guard;
            let Some(item) = inner
                .active_index
                .and_then(|i| inner.resolver.state().results.get(i))
                .cloned()
            else {
                return false;
            };
            if inner.selection.is_multiple() {
                inner.selection.toggle(Some(item), None);
            } else {
                inner.supersede_completion();
                inner.display_text.clone_from(&item.label);
                effects.text = Some(item.label.clone());
                inner.selection.toggle(Some(item), Some(true));
                inner.close();
                log::debug!("{}: closed on selection", self.id);
            }
        }
        self.notify();
        self.apply(effects);
        true
    }
}

/// A debounced, race-safe search bound to one widget instance.
///
/// Cheap to clone; clones share state. Must be used from within a tokio
/// runtime.
///
/// The selection change callback runs while the session is locked and must
/// not call back into the session.
///
/// # Example
///
/// ```ignore
/// let session = SearchSession::builder(OptionsSource::list(options(["Option 1", "Option 2"])))
///     .input_host(host)
///     .build();
///
/// session.key_pressed(Key::Char('o'));
/// session.set_query("o");
/// // ... 500ms later the top match is completed inline
/// let snapshot = session.snapshot();
/// assert_eq!(snapshot.display_text, "Option 1");
/// ```
pub struct SearchSession<V> {
    shared: Arc<Shared<V>>,
}

impl<V: SessionValue> SearchSession<V> {
    /// Create a session with the given config.
    pub fn new(source: OptionsSource<V>, config: SearchConfig) -> Self {
        Self::builder(source).config(config).build()
    }

    /// Start building a session.
    pub fn builder(source: OptionsSource<V>) -> SessionBuilder<V> {
        SessionBuilder::new(source)
    }

    /// Get the unique ID for this session.
    pub fn id(&self) -> SessionId {
        self.shared.id
    }

    // -------------------------------------------------------------------------
    // Input
    // -------------------------------------------------------------------------

    /// Update the live query (call on every keystroke).
    ///
    /// A non-empty query opens the session and restarts the debounce timer.
    /// An empty query clears the debounced query immediately.
    pub fn set_query(&self, query: impl Into<String>) {
        self.shared.set_query(query.into());
    }

    /// Record a key press and handle navigation keys.
    ///
    /// `Up`/`Down` move the highlight, `Enter` selects the highlighted
    /// result, `Escape` closes. Record keys before applying the text change
    /// they cause.
    pub fn key_pressed(&self, key: Key) {
        self.shared.lock().engine.record_key(key);
        match key {
            Key::Up => self.cursor_up(),
            Key::Down => self.cursor_down(),
            Key::Enter => {
                self.select_active();
            }
            Key::Escape => self.set_open(false),
            _ => {}
        }
    }

    // -------------------------------------------------------------------------
    // Results navigation
    // -------------------------------------------------------------------------

    /// Highlight a result (or none), completing against it.
    pub fn set_active_index(&self, index: Option<usize>) {
        self.shared.set_active_index(index);
    }

    /// Move the highlight down.
    pub fn cursor_down(&self) {
        let (current, count) = {
            let inner = self.shared.lock();
            (inner.active_index, inner.resolver.state().results.len())
        };
        if count == 0 {
            return;
        }
        let next = current.map_or(0, |i| (i + 1).min(count - 1));
        self.set_active_index(Some(next));
    }

    /// Move the highlight up.
    pub fn cursor_up(&self) {
        let current = self.shared.lock().active_index;
        if let Some(i) = current
            && i > 0
        {
            self.set_active_index(Some(i - 1));
        }
    }

    /// Commit the highlighted result.
    ///
    /// Single mode selects it and closes; multi mode toggles it and stays
    /// open. Returns false if nothing is highlighted.
    pub fn select_active(&self) -> bool {
        self.shared.select_active()
    }

    // -------------------------------------------------------------------------
    // Popover and search control
    // -------------------------------------------------------------------------

    /// Open or close the popover. Closing stops the search.
    pub fn set_open(&self, open: bool) {
        self.shared.set_open(open);
    }

    /// Check if the popover is open.
    pub fn is_open(&self) -> bool {
        self.shared.lock().open
    }

    /// Discard the in-flight request and clear `loading`.
    ///
    /// Idempotent; safe with nothing in flight.
    pub fn stop_search(&self) {
        self.shared.lock().stop_search();
        log::debug!("{}: search stopped", self.shared.id);
        self.shared.notify();
    }

    /// Clear the last provider error.
    pub fn clear_error(&self) {
        self.shared.lock().resolver.clear_error();
        self.shared.notify();
    }

    /// Replace the options source, resetting results.
    pub fn set_source(&self, source: OptionsSource<V>) {
        let mut effects = HostEffects::default();
        {
            let mut guard = self.shared.lock();
            let inner = &mut *guard;
            inner.resolver.set_source(source);
            inner.engine.reset();
            inner.active_index = None;
            log::debug!("{}: options source replaced", self.shared.id);
            if inner.open {
                self.shared.resolve(inner, &mut effects);
            } else {
                inner.stale = true;
            }
        }
        self.shared.notify();
        self.shared.apply(effects);
    }

    /// Cancel timers and the in-flight request.
    pub fn shutdown(&self) {
        let mut inner = self.shared.lock();
        inner.debounce.cancel();
        inner.pipeline.cancel();
        inner.supersede_completion();
        inner.resolver.stop();
    }

    // -------------------------------------------------------------------------
    // Selection
    // -------------------------------------------------------------------------

    /// Toggle `item`; see [`SelectionController::toggle`].
    pub fn toggle(&self, item: Option<SearchOption<V>>, force: Option<bool>) -> bool {
        let changed = self.shared.lock().selection.toggle(item, force);
        if changed {
            self.shared.notify();
        }
        changed
    }

    /// Check if `item` is selected.
    pub fn is_selected(&self, item: &SearchOption<V>) -> bool {
        self.shared.lock().selection.is_selected(item)
    }

    /// The selected value.
    pub fn value(&self) -> SelectionValue<V> {
        self.shared.lock().selection.value().clone()
    }

    /// Update the externally controlled value (`None` = uncontrolled).
    pub fn set_controlled_value(&self, value: Option<SelectionValue<V>>) {
        self.shared.lock().selection.set_controlled(value);
        self.shared.notify();
    }

    // -------------------------------------------------------------------------
    // Read model
    // -------------------------------------------------------------------------

    /// Capture the current state for rendering.
    pub fn snapshot(&self) -> SearchSnapshot<V> {
        let inner = self.shared.lock();
        let state = inner.resolver.state();
        let view = classify(&PresentationInput {
            query: inner.pipeline.live(),
            debounced_query: inner.pipeline.debounced(),
            loading: state.loading,
            result_count: state.results.len(),
            min_search_length: inner.pipeline.min_search_length(),
        });
        SearchSnapshot {
            query: inner.pipeline.live().to_owned(),
            debounced_query: inner.pipeline.debounced().to_owned(),
            display_text: inner.display_text.clone(),
            open: inner.open,
            loading: state.loading,
            results: state.results.clone(),
            error: state.error.clone(),
            view,
            active_index: inner.active_index,
            completion: inner.completion.clone(),
            value: inner.selection.value().clone(),
        }
    }

    /// Install a wakeup sender, replacing any previous one.
    ///
    /// A session that is already dirty wakes the new sender right away.
    pub fn install_wakeup(&self, sender: WakeupSender) {
        if self.is_dirty() {
            sender.wake(self.shared.id);
        }
        if let Ok(mut guard) = self.shared.wakeup.lock() {
            *guard = Some(sender);
        }
    }

    /// Check if the session has changed since the last check.
    pub fn is_dirty(&self) -> bool {
        self.shared.dirty.load(Ordering::SeqCst)
    }

    /// Clear the dirty flag.
    ///
    /// A session sends one wakeup per dirty cycle; the next change after
    /// this call sends another.
    pub fn clear_dirty(&self) {
        self.shared.dirty.store(false, Ordering::SeqCst);
    }
}

impl<V> Clone for SearchSession<V> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<V> std::fmt::Debug for SearchSession<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchSession")
            .field("id", &self.shared.id)
            .finish_non_exhaustive()
    }
}

impl<V: SessionValue> SelectionContext<V> for SearchSession<V> {
    fn is_selected(&self, item: &SearchOption<V>) -> bool {
        SearchSession::is_selected(self, item)
    }

    fn toggle(&mut self, item: Option<SearchOption<V>>, force: Option<bool>) -> bool {
        SearchSession::toggle(self, item, force)
    }
}

/// Builder for [`SearchSession`].
pub struct SessionBuilder<V> {
    source: OptionsSource<V>,
    config: SearchConfig,
    initial_options: Option<Vec<SearchOption<V>>>,
    selection: Option<SelectionController<V>>,
    host: Option<Arc<dyn InputHost>>,
    wakeup: Option<WakeupSender>,
}

impl<V: SessionValue> SessionBuilder<V> {
    fn new(source: OptionsSource<V>) -> Self {
        Self {
            source,
            config: SearchConfig::default(),
            initial_options: None,
            selection: None,
            host: None,
            wakeup: None,
        }
    }

    /// Set the search config.
    pub fn config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    /// Seed list shown for an empty query.
    pub fn initial_options(mut self, options: Vec<SearchOption<V>>) -> Self {
        self.initial_options = Some(options);
        self
    }

    /// Selection controller (default: single, uncontrolled).
    pub fn selection(mut self, selection: SelectionController<V>) -> Self {
        self.selection = Some(selection);
        self
    }

    /// Text input receiving completions.
    pub fn input_host(mut self, host: Arc<dyn InputHost>) -> Self {
        self.host = Some(host);
        self
    }

    /// Wakeup sender signalled on every change.
    pub fn wakeup(mut self, sender: WakeupSender) -> Self {
        self.wakeup = Some(sender);
        self
    }

    /// Build the session.
    pub fn build(self) -> SearchSession<V> {
        let config = self.config;
        let mut resolver = OptionsResolver::new(self.source, &config);
        if let Some(options) = self.initial_options {
            resolver = resolver.with_initial_options(options);
        }
        let inner = SessionInner {
            open: false,
            stale: true,
            pipeline: QueryPipeline::from_config(&config),
            resolver,
            engine: CompletionEngine::new(config.auto_select),
            selection: self.selection.unwrap_or_else(SelectionController::single),
            active_index: None,
            display_text: String::new(),
            completion: None,
            debounce: DebounceTimer::new(),
            selection_timer: DebounceTimer::new(),
            selection_generation: 0,
            config,
        };
        SearchSession {
            shared: Arc::new(Shared {
                id: SessionId::new(),
                inner: Mutex::new(inner),
                dirty: AtomicBool::new(false),
                wakeup: Mutex::new(self.wakeup),
                host: self.host,
            }),
        }
    }
}

impl<V> std::fmt::Debug for SessionBuilder<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBuilder")
            .field("source", &self.source)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
