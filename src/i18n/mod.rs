//! Internationalization (i18n) engine for the marketing site.
//!
//! Pages ship with default-language (English) text. Switching language
//! fetches per-language JSON dictionaries, merges them over the default
//! dictionary and rewrites the page in place.
//!
//! # Architecture
//!
//! - `registry`: Single source of truth for the supported languages
//! - `language`: Type-safe Language handle backed by the registry
//! - `dictionary`: Nested key → text trees, lookup, flattening and merging
//! - `store`: HTTP loading with retries and a page-lifetime cache
//! - `value_map`: Forward/reverse text maps for markup without keys
//! - `reconciler`: Applies a language to a [`Page`](crate::dom::Page)
//! - `session`: Active language, selector clicks, ordering of switches
//! - `preferences`: Persisted language choice
//! - `validator`: Dictionary completeness checks
//! - `metrics`: Cache and fetch counters
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vxn_site::i18n::{Language, LanguageSession, MemoryPreferences, Reconciler, TranslationStore};
//!
//! let store = Arc::new(TranslationStore::new(reqwest::Client::new(), "https://vxn.example"));
//! let reconciler = Reconciler::new(store, Language::default_language());
//! let session = LanguageSession::new(page, reconciler, MemoryPreferences::new());
//!
//! session.init().await;
//! session.switch_language(Language::from_code("fr")?).await;
//! ```

mod dictionary;
mod language;
mod metrics;
mod preferences;
mod reconciler;
mod registry;
mod session;
mod store;
mod validator;
mod value_map;

pub use dictionary::{Dictionary, DictionaryError, Entry};
pub use language::Language;
pub use metrics::{MetricsReport, StoreMetrics};
pub use preferences::{FilePreferences, MemoryPreferences, PreferenceError, PreferenceStore, STORAGE_KEY};
pub use reconciler::{PreparedTranslation, ReconcileReport, Reconciler, I18N_ATTRIBUTE, LEAF_TAGS};
pub use registry::{LanguageConfig, LanguageRegistry};
pub use session::{LanguageSession, SwitchOutcome, ACTIVE_CLASS, LANGUAGE_ATTRIBUTE};
pub use store::{FetchError, TranslationStore, DICTIONARY_DIR};
pub use validator::{DictionaryValidator, ValidationReport};
pub use value_map::{retranslate, Direction, ValueMap};
