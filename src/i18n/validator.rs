//! Dictionary completeness validation.
//!
//! Compares a target-language dictionary against the default-language one
//! so gaps show up before a page silently falls back to the default text.

use regex::Regex;
use std::sync::OnceLock;

use crate::i18n::dictionary::Dictionary;

/// Validation report containing errors and warnings about a dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    /// Keys the target must provide but does not
    pub errors: Vec<String>,

    /// Suspicious entries that still render
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Check if the report is clean (no errors or warnings)
    pub fn is_clean(&self) -> bool {
        !self.has_errors() && !self.has_warnings()
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Validator for dictionary coverage.
pub struct DictionaryValidator;

static LETTER_REGEX: OnceLock<Regex> = OnceLock::new();

impl DictionaryValidator {
    /// Validate `target` against `default`.
    ///
    /// - keys missing from the target are errors
    /// - keys only present in the target are warnings
    /// - values equal to the default text are warnings, unless they hold no
    ///   letters (brand marks, numbers, punctuation)
    /// - empty values are warnings
    pub fn validate(default: &Dictionary, target: &Dictionary) -> ValidationReport {
        let mut report = ValidationReport::new();
        let default_flat = default.flatten();
        let target_flat = target.flatten();

        for (key, source) in &default_flat {
            match target_flat.get(key) {
                None => report.errors.push(format!("Missing key: {}", key)),
                Some(translated) if translated.trim().is_empty() => {
                    report.warnings.push(format!("Empty value: {}", key))
                }
                Some(translated) if translated == source && Self::has_letters(source) => report
                    .warnings
                    .push(format!("Untranslated value for {}: {:?}", key, source)),
                Some(_) => {}
            }
        }

        for key in target_flat.keys() {
            if !default_flat.contains_key(key) {
                report.warnings.push(format!("Unknown key: {}", key));
            }
        }

        report
    }

    fn has_letters(text: &str) -> bool {
        let regex = LETTER_REGEX.get_or_init(|| Regex::new(r"\p{L}").unwrap());
        regex.is_match(text)
    }
}
