//! Value maps for round-trip matching of untagged text.
//!
//! Markup that predates the `data-i18n` convention has no keys, so its text
//! is matched by value instead: every default-language string is paired with
//! the string stored under the same key in the target dictionary.

use std::collections::HashMap;

use crate::i18n::dictionary::Dictionary;

/// Which way text is being translated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Default-language text becomes target-language text.
    ToTarget,
    /// Target-language text goes back to the default language.
    ToDefault,
}

/// Forward (default → target) and reverse (target → default) string lookups.
#[derive(Debug, Clone, Default)]
pub struct ValueMap {
    forward: HashMap<String, String>,
    reverse: HashMap<String, String>,
}

impl ValueMap {
    /// Pair the leaves of `default` and `target` that share a key path.
    ///
    /// Keys present in only one dictionary contribute nothing, and neither
    /// do keys whose text is the same in both. When several keys share a
    /// value, the first key in sorted order wins.
    pub fn build(default: &Dictionary, target: &Dictionary) -> Self {
        let target_flat = target.flatten();
        let mut map = Self::default();

        for (key, source) in default.flatten() {
            let Some(translated) = target_flat.get(&key) else {
                continue;
            };
            if *translated == source {
                continue;
            }
            map.reverse
                .entry(translated.clone())
                .or_insert_with(|| source.clone());
            map.forward.entry(source).or_insert_with(|| translated.clone());
        }
        map
    }

    pub fn forward(&self, text: &str) -> Option<&str> {
        self.forward.get(text).map(String::as_str)
    }

    pub fn reverse(&self, text: &str) -> Option<&str> {
        self.reverse.get(text).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

/// Replacement text for `current_text`, if the map knows a different one.
///
/// The text is trimmed before lookup. `None` means "leave it alone": no
/// mapping exists, or the mapping would not change anything.
pub fn retranslate(current_text: &str, map: &ValueMap, direction: Direction) -> Option<String> {
    let trimmed = current_text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let candidate = match direction {
        Direction::ToTarget => map.forward(trimmed),
        Direction::ToDefault => map.reverse(trimmed),
    }?;

    (candidate != trimmed).then(|| candidate.to_string())
}
