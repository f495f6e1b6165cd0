//! Async search and selection core for searchable select and autocomplete
//! widgets.
//!
//! The pieces compose bottom-up: a [`QueryPipeline`](query::QueryPipeline)
//! debounces keystrokes, an [`OptionsResolver`](resolver::OptionsResolver)
//! turns debounced queries into results while discarding superseded
//! responses, [`classify`](presentation::classify) picks the results panel
//! state, a [`CompletionEngine`](completion::CompletionEngine) completes the
//! top match inline and a [`SelectionController`](selection::SelectionController)
//! owns the selected value. [`SearchSession`](session::SearchSession) drives
//! all of them on tokio.

pub mod completion;
pub mod config;
pub mod debounce;
pub mod error;
pub mod filter;
pub mod option;
pub mod presentation;
pub mod query;
pub mod resolver;
pub mod selection;
pub mod session;
pub mod wakeup;

pub use session::SearchSession;

pub mod prelude {
    pub use crate::completion::{Completion, CompletionEngine, Key, complete_against};
    pub use crate::config::SearchConfig;
    pub use crate::error::{ConfigError, ProviderError, SearchError};
    pub use crate::filter::{MatchRule, filter_options, fuzzy_filter};
    pub use crate::option::{OptionItem, OptionKey, SearchOption, options};
    pub use crate::presentation::{PresentationInput, ResultsView, classify};
    pub use crate::query::{QueryChange, QueryPipeline};
    pub use crate::resolver::{
        FnProvider, OptionsProvider, OptionsResolver, OptionsSource, Resolution, SearchState,
    };
    pub use crate::selection::{SelectionContext, SelectionController, SelectionValue};
    pub use crate::session::{
        InputHost, SearchSession, SearchSnapshot, SessionBuilder, SessionId, SessionValue,
    };
    pub use crate::wakeup::{WakeupReceiver, WakeupSender};

    pub use async_trait::async_trait;
}
