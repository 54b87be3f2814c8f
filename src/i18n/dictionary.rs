//! Translation dictionaries: nested key/value trees addressed by dotted paths.

use std::collections::BTreeMap;

use jsonc_parser::ParseOptions;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DictionaryError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid JSONC: {0}")]
    Jsonc(String),

    #[error("dictionary root must be an object")]
    NotAnObject,
}

/// One node of a dictionary tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Entry {
    Text(String),
    Nested(Dictionary),
}

/// A language's tree of translation entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Dictionary {
    entries: BTreeMap<String, Entry>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a strict JSON document.
    pub fn from_json(text: &str) -> Result<Self, DictionaryError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    /// Parse a JSON document that may contain comments and trailing commas.
    pub fn from_jsonc(text: &str) -> Result<Self, DictionaryError> {
        let value = jsonc_parser::parse_to_serde_value(text, &ParseOptions::default())
            .map_err(|e| DictionaryError::Jsonc(e.to_string()))?
            .ok_or(DictionaryError::NotAnObject)?;
        Self::from_value(value)
    }

    /// Build a dictionary from a JSON object.
    ///
    /// String leaves and nested objects are kept; numbers, booleans, null
    /// and arrays are dropped since they can never be displayed as text.
    pub fn from_value(value: Value) -> Result<Self, DictionaryError> {
        match value {
            Value::Object(map) => {
                let entries = map
                    .into_iter()
                    .filter_map(|(key, value)| match value {
                        Value::String(text) => Some((key, Entry::Text(text))),
                        Value::Object(_) => Self::from_value(value)
                            .ok()
                            .map(|nested| (key, Entry::Nested(nested))),
                        _ => None,
                    })
                    .collect();
                Ok(Self { entries })
            }
            _ => Err(DictionaryError::NotAnObject),
        }
    }

    /// Insert a leaf at a dotted path, creating intermediate levels.
    ///
    /// An existing leaf on the way is replaced by a nested level.
    pub fn insert(&mut self, path: &str, text: impl Into<String>) {
        let mut current = self;
        let mut segments = path.split('.').peekable();
        while let Some(segment) = segments.next() {
            if segments.peek().is_none() {
                current
                    .entries
                    .insert(segment.to_string(), Entry::Text(text.into()));
                return;
            }
            let entry = current
                .entries
                .entry(segment.to_string())
                .or_insert_with(|| Entry::Nested(Dictionary::new()));
            if let Entry::Text(_) = entry {
                *entry = Entry::Nested(Dictionary::new());
            }
            let Entry::Nested(nested) = entry else {
                return;
            };
            current = nested;
        }
    }

    /// Walk the tree along a dotted key path.
    pub fn get(&self, path: &str) -> Option<&Entry> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut entry = self.entries.get(first)?;
        for segment in segments {
            entry = match entry {
                Entry::Nested(nested) => nested.entries.get(segment)?,
                Entry::Text(_) => return None,
            };
        }
        Some(entry)
    }

    /// Resolve a dotted key to its string value.
    ///
    /// Paths that end on a nested level resolve to `None`, same as missing keys.
    pub fn get_text(&self, path: &str) -> Option<&str> {
        match self.get(path)? {
            Entry::Text(text) => Some(text),
            Entry::Nested(_) => None,
        }
    }

    /// Flatten the tree into `dotted.path -> value` pairs.
    pub fn flatten(&self) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        self.flatten_into("", &mut out);
        out
    }

    fn flatten_into(&self, prefix: &str, out: &mut BTreeMap<String, String>) {
        for (key, entry) in &self.entries {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{}.{}", prefix, key)
            };
            match entry {
                Entry::Text(text) => {
                    out.insert(path, text.clone());
                }
                Entry::Nested(nested) => nested.flatten_into(&path, out),
            }
        }
    }

    /// Overlay `overrides` on top of this dictionary.
    ///
    /// Every key of `overrides` wins; keys only present here are kept, at
    /// any depth, so a key defined in `self` is never missing from the result.
    pub fn merged_with(&self, overrides: &Dictionary) -> Dictionary {
        let mut merged = self.clone();
        for (key, entry) in &overrides.entries {
            let combined = match (merged.entries.get(key), entry) {
                (Some(Entry::Nested(base)), Entry::Nested(over)) => {
                    Entry::Nested(base.merged_with(over))
                }
                _ => entry.clone(),
            };
            merged.entries.insert(key.clone(), combined);
        }
        merged
    }

    /// Number of string leaves.
    pub fn len(&self) -> usize {
        self.entries
            .values()
            .map(|entry| match entry {
                Entry::Text(_) => 1,
                Entry::Nested(nested) => nested.len(),
            })
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
