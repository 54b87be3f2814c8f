//! Language session: the active language of one page and its switches.
//!
//! A session owns the page, the reconciler and the preference storage. Every
//! switch takes a new generation number before it starts fetching; when the
//! dictionaries arrive, a switch whose generation is no longer the latest
//! is dropped without touching the page, so the last click always wins even
//! when an earlier fetch resolves later.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::dom::{closest, NodeId, Page, Selector};
use crate::i18n::language::Language;
use crate::i18n::preferences::PreferenceStore;
use crate::i18n::reconciler::{ReconcileReport, Reconciler};

/// Attribute marking a language selector control; its value is the code.
pub const LANGUAGE_ATTRIBUTE: &str = "data-lang";

/// Class set on the selector control of the active language.
pub const ACTIVE_CLASS: &str = "active";

static LANGUAGE_SELECTOR: OnceLock<Selector> = OnceLock::new();

fn language_selector() -> &'static Selector {
    LANGUAGE_SELECTOR.get_or_init(|| Selector::parse("[data-lang]").unwrap())
}

/// Result of a language switch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// The page was rewritten and the preference saved.
    Applied(ReconcileReport),
    /// A newer switch started while this one was fetching.
    Superseded,
    /// The click did not target a usable language selector.
    Ignored,
}

#[derive(Debug)]
struct SessionState<P> {
    page: P,
    active: Option<Language>,
}

#[derive(Debug)]
pub struct LanguageSession<P, S> {
    state: Mutex<SessionState<P>>,
    reconciler: Reconciler,
    preferences: S,
    generation: AtomicU64,
}

impl<P: Page, S: PreferenceStore> LanguageSession<P, S> {
    pub fn new(page: P, reconciler: Reconciler, preferences: S) -> Self {
        Self {
            state: Mutex::new(SessionState { page, active: None }),
            reconciler,
            preferences,
            generation: AtomicU64::new(0),
        }
    }

    /// Apply the persisted language, or the default one.
    pub async fn init(&self) -> SwitchOutcome {
        let language = self.saved_language();
        info!("Initializing page language: {}", language);
        self.switch_language(language).await
    }

    /// Rewrite the page for `language` and remember the choice.
    pub async fn switch_language(&self, language: Language) -> SwitchOutcome {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let previous = self.state.lock().await.active;

        let prepared = self.reconciler.prepare(language, previous).await;

        let mut state = self.state.lock().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            info!(
                "Discarding switch to '{}' (generation {}), a newer switch is pending",
                language, generation
            );
            return SwitchOutcome::Superseded;
        }

        let report = self.reconciler.apply(&mut state.page, &prepared);
        mark_active_selectors(&mut state.page, language);
        state.active = Some(language);
        drop(state);

        if let Err(e) = self.preferences.save(language.code()) {
            warn!("Failed to persist language preference: {}", e);
        }
        SwitchOutcome::Applied(report)
    }

    /// Handle a click on `target`, switching language if it sits inside a
    /// `[data-lang]` control.
    pub async fn handle_click(&self, target: NodeId) -> SwitchOutcome {
        let code = {
            let state = self.state.lock().await;
            closest(&state.page, target, language_selector())
                .and_then(|control| state.page.attribute(control, LANGUAGE_ATTRIBUTE))
                .map(|code| code.trim().to_string())
        };

        let Some(code) = code.filter(|code| !code.is_empty()) else {
            return SwitchOutcome::Ignored;
        };

        match Language::from_code(&code) {
            Ok(language) => self.switch_language(language).await,
            Err(e) => {
                warn!("Ignoring language selector: {}", e);
                SwitchOutcome::Ignored
            }
        }
    }

    /// Language currently rendered on the page.
    pub async fn active_language(&self) -> Option<Language> {
        self.state.lock().await.active
    }

    /// Run `f` with exclusive access to the page.
    pub async fn with_page<R>(&self, f: impl FnOnce(&mut P) -> R) -> R {
        let mut state = self.state.lock().await;
        f(&mut state.page)
    }

    pub fn preferences(&self) -> &S {
        &self.preferences
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn into_page(self) -> P {
        self.state.into_inner().page
    }

    fn saved_language(&self) -> Language {
        let default = self.reconciler.default_language();
        match self.preferences.load() {
            Ok(Some(code)) => Language::from_code(&code).unwrap_or_else(|e| {
                debug!("Stored language not usable ({}), using '{}'", e, default);
                default
            }),
            Ok(None) => default,
            Err(e) => {
                warn!("Language preference unreadable ({}), using '{}'", e, default);
                default
            }
        }
    }
}

/// Highlight the selector controls of `language`, clear the others.
fn mark_active_selectors<P: Page + ?Sized>(page: &mut P, language: Language) {
    for id in page.elements() {
        let Some(code) = page.attribute(id, LANGUAGE_ATTRIBUTE) else {
            continue;
        };
        if code.trim() == language.code() {
            page.add_class(id, ACTIVE_CLASS);
            page.set_attribute(id, "aria-pressed", "true");
        } else {
            page.remove_class(id, ACTIVE_CLASS);
            page.set_attribute(id, "aria-pressed", "false");
        }
    }
}
