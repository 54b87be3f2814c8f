//! Text reconciler: rewrites page text to match a language.
//!
//! Work is split in two phases. [`Reconciler::prepare`] is async and only
//! talks to the [`TranslationStore`]; [`Reconciler::apply`] is synchronous and
//! only touches the page. The session uses the gap between them to drop
//! results that a newer language switch has superseded.

use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::dom::{select_first, NodeId, Page, Selector};
use crate::i18n::dictionary::Dictionary;
use crate::i18n::language::Language;
use crate::i18n::store::TranslationStore;
use crate::i18n::value_map::{retranslate, Direction, ValueMap};

/// Attribute naming the dotted translation key of an element.
pub const I18N_ATTRIBUTE: &str = "data-i18n";

/// Tags whose untagged text is matched by value.
pub const LEAF_TAGS: &[&str] = &[
    "h1", "h2", "h3", "h4", "h5", "h6", "p", "a", "button", "label", "li", "span", "strong", "em",
    "small", "b", "i", "td", "th", "dt", "dd", "figcaption", "summary", "option", "blockquote",
    "cite",
];

/// Markup written before `data-i18n` existed.
const LEGACY_RULES: &[(&str, &str)] = &[
    (".nav-cta a.btn.btn-primary", "nav.requestDemo"),
    (".footer-links a[href=\"privacy.html\"]", "common.privacy"),
    (".footer-links a[href=\"security.html\"]", "common.security"),
];

const FOOTER_RIGHTS_SELECTOR: &str = ".site-footer .muted";
const RIGHTS_EN: &str = "All rights reserved.";
const RIGHTS_FR: &str = "Tous droits réservés.";

static LEGACY_SELECTORS: OnceLock<Vec<(Selector, &'static str)>> = OnceLock::new();
static FOOTER_SELECTOR: OnceLock<Selector> = OnceLock::new();

fn legacy_selectors() -> &'static [(Selector, &'static str)] {
    LEGACY_SELECTORS.get_or_init(|| {
        LEGACY_RULES
            .iter()
            .map(|(selector, key)| (Selector::parse(selector).unwrap(), *key))
            .collect()
    })
}

fn footer_selector() -> &'static Selector {
    FOOTER_SELECTOR.get_or_init(|| Selector::parse(FOOTER_RIGHTS_SELECTOR).unwrap())
}

/// Everything needed to rewrite a page, computed before touching it.
#[derive(Debug, Clone)]
pub struct PreparedTranslation {
    language: Language,
    merged: Dictionary,
    value_map: ValueMap,
    direction: Direction,
}

impl PreparedTranslation {
    pub fn language(&self) -> Language {
        self.language
    }

    /// Target dictionary overlaid on the default one.
    pub fn merged(&self) -> &Dictionary {
        &self.merged
    }

    pub fn value_map(&self) -> &ValueMap {
        &self.value_map
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }
}

/// Number of writes each pass made.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub tagged: usize,
    pub untagged: usize,
    pub placeholders: usize,
    pub legacy: usize,
    pub footer: usize,
    /// Tagged elements whose key resolved to nothing (left untouched)
    pub missing_keys: usize,
}

impl ReconcileReport {
    pub fn total_changes(&self) -> usize {
        self.tagged + self.untagged + self.placeholders + self.legacy + self.footer
    }
}

#[derive(Debug)]
pub struct Reconciler {
    store: Arc<TranslationStore>,
    default_language: Language,
}

impl Reconciler {
    pub fn new(store: Arc<TranslationStore>, default_language: Language) -> Self {
        Self {
            store,
            default_language,
        }
    }

    pub fn default_language(&self) -> Language {
        self.default_language
    }

    pub fn store(&self) -> &TranslationStore {
        &self.store
    }

    /// Fetch and merge the dictionaries for `language`.
    ///
    /// `previous` is the language currently on the page. Going back to the
    /// default language needs its dictionary to build the reverse value map.
    pub async fn prepare(&self, language: Language, previous: Option<Language>) -> PreparedTranslation {
        let default_code = self.default_language.code();

        if language == self.default_language {
            let leaving = previous.filter(|lang| *lang != self.default_language);
            let (default, leaving) = futures::join!(
                self.store.load_translations(default_code),
                async {
                    match leaving {
                        Some(lang) => Some(self.store.load_translations(lang.code()).await),
                        None => None,
                    }
                }
            );

            let value_map = match leaving {
                Some(leaving) => ValueMap::build(&default, &default.merged_with(&leaving)),
                None => ValueMap::default(),
            };

            PreparedTranslation {
                language,
                merged: (*default).clone(),
                value_map,
                direction: Direction::ToDefault,
            }
        } else {
            let (default, target) = futures::join!(
                self.store.load_translations(default_code),
                self.store.load_translations(language.code())
            );

            let merged = default.merged_with(&target);
            let value_map = ValueMap::build(&default, &merged);

            PreparedTranslation {
                language,
                merged,
                value_map,
                direction: Direction::ToTarget,
            }
        }
    }

    /// Rewrite the page for a prepared language.
    pub fn apply<P: Page + ?Sized>(&self, page: &mut P, prepared: &PreparedTranslation) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        page.set_document_lang(prepared.language.code());
        self.apply_tagged(page, prepared, &mut report);
        self.apply_untagged(page, prepared, &mut report);
        self.apply_placeholders(page, prepared, &mut report);
        self.apply_legacy(page, prepared, &mut report);
        self.apply_footer_rights(page, prepared, &mut report);

        debug!(
            "Applied '{}': {} changes, {} missing keys",
            prepared.language,
            report.total_changes(),
            report.missing_keys
        );
        report
    }

    /// Fetch, merge and apply in one go.
    pub async fn apply_translations<P: Page + ?Sized>(
        &self,
        page: &mut P,
        language: Language,
        previous: Option<Language>,
    ) -> ReconcileReport {
        let prepared = self.prepare(language, previous).await;
        self.apply(page, &prepared)
    }

    fn apply_tagged<P: Page + ?Sized>(
        &self,
        page: &mut P,
        prepared: &PreparedTranslation,
        report: &mut ReconcileReport,
    ) {
        for id in page.elements() {
            let Some(key) = page.attribute(id, I18N_ATTRIBUTE).map(str::to_owned) else {
                continue;
            };
            match prepared.merged.get_text(&key) {
                Some(text) => {
                    if set_text_if_changed(page, id, text) {
                        report.tagged += 1;
                    }
                }
                None => {
                    report.missing_keys += 1;
                    debug!("No '{}' translation for key '{}'", prepared.language, key);
                }
            }
        }
    }

    fn apply_untagged<P: Page + ?Sized>(
        &self,
        page: &mut P,
        prepared: &PreparedTranslation,
        report: &mut ReconcileReport,
    ) {
        for id in page.elements() {
            if !LEAF_TAGS.contains(&page.tag_name(id))
                || page.has_attribute(id, I18N_ATTRIBUTE)
                || page.has_element_children(id)
            {
                continue;
            }
            let current = page.text_content(id);
            if let Some(text) = retranslate(&current, &prepared.value_map, prepared.direction) {
                page.set_text_content(id, &text);
                report.untagged += 1;
            }
        }
    }

    fn apply_placeholders<P: Page + ?Sized>(
        &self,
        page: &mut P,
        prepared: &PreparedTranslation,
        report: &mut ReconcileReport,
    ) {
        for id in page.elements() {
            if !matches!(page.tag_name(id), "input" | "textarea") {
                continue;
            }
            let Some(current) = page.attribute(id, "placeholder") else {
                continue;
            };
            if let Some(text) = retranslate(current, &prepared.value_map, prepared.direction) {
                page.set_attribute(id, "placeholder", &text);
                report.placeholders += 1;
            }
        }
    }

    fn apply_legacy<P: Page + ?Sized>(
        &self,
        page: &mut P,
        prepared: &PreparedTranslation,
        report: &mut ReconcileReport,
    ) {
        for (selector, key) in legacy_selectors() {
            let Some(id) = select_first(page, selector) else {
                continue;
            };
            if let Some(text) = prepared.merged.get_text(key) {
                if set_text_if_changed(page, id, text) {
                    report.legacy += 1;
                }
            }
        }
    }

    fn apply_footer_rights<P: Page + ?Sized>(
        &self,
        page: &mut P,
        prepared: &PreparedTranslation,
        report: &mut ReconcileReport,
    ) {
        let Some(id) = select_first(page, footer_selector()) else {
            return;
        };
        let current = page.text_content(id);

        let replaced = if prepared.language == Language::ENGLISH {
            current
                .contains(RIGHTS_FR)
                .then(|| current.replacen(RIGHTS_FR, RIGHTS_EN, 1))
        } else if prepared.language == Language::FRENCH {
            current
                .contains(RIGHTS_EN)
                .then(|| current.replacen(RIGHTS_EN, RIGHTS_FR, 1))
        } else {
            None
        };

        if let Some(text) = replaced {
            page.set_text_content(id, &text);
            report.footer += 1;
        }
    }
}

fn set_text_if_changed<P: Page + ?Sized>(page: &mut P, id: NodeId, text: &str) -> bool {
    if page.text_content(id) == text {
        return false;
    }
    page.set_text_content(id, text);
    true
}
