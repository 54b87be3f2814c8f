//! Persisted language preference (the client-local `vxn_lang` key).

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::{Map, Value};
use thiserror::Error;

/// Storage key holding the last selected language code.
pub const STORAGE_KEY: &str = "vxn_lang";

#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("storage is unavailable")]
    Unavailable,
}

/// Key/value storage for the language preference.
pub trait PreferenceStore {
    fn load(&self) -> Result<Option<String>, PreferenceError>;

    fn save(&self, language: &str) -> Result<(), PreferenceError>;
}

/// Preference kept in memory only.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    value: Mutex<Option<String>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(language: &str) -> Self {
        Self {
            value: Mutex::new(Some(language.to_string())),
        }
    }
}

impl PreferenceStore for MemoryPreferences {
    fn load(&self) -> Result<Option<String>, PreferenceError> {
        let value = self.value.lock().map_err(|_| PreferenceError::Unavailable)?;
        Ok(value.clone())
    }

    fn save(&self, language: &str) -> Result<(), PreferenceError> {
        let mut value = self.value.lock().map_err(|_| PreferenceError::Unavailable)?;
        *value = Some(language.to_string());
        Ok(())
    }
}

/// Preference stored in a JSON object file, next to any other keys it holds.
#[derive(Debug, Clone)]
pub struct FilePreferences {
    path: PathBuf,
}

impl FilePreferences {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<Map<String, Value>, PreferenceError> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let text = std::fs::read_to_string(&self.path)?;
        match serde_json::from_str::<Value>(&text)? {
            Value::Object(map) => Ok(map),
            _ => Ok(Map::new()),
        }
    }
}

impl PreferenceStore for FilePreferences {
    fn load(&self) -> Result<Option<String>, PreferenceError> {
        let map = self.read_map()?;
        Ok(map
            .get(STORAGE_KEY)
            .and_then(Value::as_str)
            .map(str::to_owned))
    }

    fn save(&self, language: &str) -> Result<(), PreferenceError> {
        // A corrupt file is replaced rather than blocking the write.
        let mut map = self.read_map().unwrap_or_default();
        map.insert(STORAGE_KEY.to_string(), Value::String(language.to_string()));

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&map)?)?;
        Ok(())
    }
}
