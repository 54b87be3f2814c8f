//! Translation store: fetches per-language dictionaries and caches them for
//! the lifetime of the store.
//!
//! Loading never fails from the caller's point of view. Network errors,
//! non-success statuses and unparsable bodies all degrade to an empty
//! dictionary so a broken translation file can never block rendering.

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::header::CACHE_CONTROL;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::i18n::dictionary::{Dictionary, DictionaryError};
use crate::i18n::metrics::StoreMetrics;
use crate::retry::{with_retry_if, RetryConfig};

/// Directory (relative to the site root) holding `{lang}.json` files.
pub const DICTIONARY_DIR: &str = "assets/i18n";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),

    #[error("invalid dictionary: {0}")]
    Parse(#[from] DictionaryError),
}

impl FetchError {
    /// Network errors, 5xx and 429 are worth another attempt.
    fn is_retryable(&self) -> bool {
        match self {
            FetchError::Request(e) => !e.is_decode(),
            FetchError::Status(status) => {
                status.is_server_error() || *status == reqwest::StatusCode::TOO_MANY_REQUESTS
            }
            FetchError::Parse(_) => false,
        }
    }
}

/// Page-lifetime dictionary cache backed by HTTP.
#[derive(Debug)]
pub struct TranslationStore {
    client: reqwest::Client,
    base_url: String,
    lenient: bool,
    retry: RetryConfig,
    cache: RwLock<HashMap<String, Arc<Dictionary>>>,
    metrics: StoreMetrics,
}

impl TranslationStore {
    /// Create a store fetching from `{base_url}/assets/i18n/{lang}.json`.
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            lenient: true,
            retry: RetryConfig::dictionary_fetch(),
            cache: RwLock::new(HashMap::new()),
            metrics: StoreMetrics::new(),
        }
    }

    /// Accept `//` and `/* */` comments and trailing commas (on by default).
    pub fn with_lenient_parsing(mut self, lenient: bool) -> Self {
        self.lenient = lenient;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn dictionary_url(&self, lang: &str) -> String {
        format!(
            "{}/{}/{}.json",
            self.base_url.trim_end_matches('/'),
            DICTIONARY_DIR,
            lang
        )
    }

    pub fn metrics(&self) -> &StoreMetrics {
        &self.metrics
    }

    /// Cached dictionary for `lang`, without fetching.
    pub async fn cached(&self, lang: &str) -> Option<Arc<Dictionary>> {
        self.cache.read().await.get(lang).cloned()
    }

    /// Load the dictionary for `lang`, from cache when possible.
    ///
    /// Failed loads return an empty dictionary and are not cached, so the
    /// next request for the same language tries the network again.
    pub async fn load_translations(&self, lang: &str) -> Arc<Dictionary> {
        if let Some(dictionary) = self.cached(lang).await {
            self.metrics.record_cache_hit();
            debug!("Translations for '{}' served from cache", lang);
            return dictionary;
        }
        self.metrics.record_cache_miss();

        match self.fetch(lang).await {
            Ok(dictionary) => {
                info!("Loaded {} translations for '{}'", dictionary.len(), lang);
                let dictionary = Arc::new(dictionary);
                self.cache
                    .write()
                    .await
                    .insert(lang.to_string(), Arc::clone(&dictionary));
                dictionary
            }
            Err(e) => {
                self.metrics.record_load_failure();
                warn!("Failed to load translations for '{}': {}", lang, e);
                Arc::new(Dictionary::new())
            }
        }
    }

    /// Fetch `lang` from the network, bypassing the cache and reporting
    /// failures instead of degrading.
    pub async fn fetch(&self, lang: &str) -> Result<Dictionary, FetchError> {
        let url = self.dictionary_url(lang);

        with_retry_if(
            &self.retry,
            &format!("Dictionary fetch for '{}'", lang),
            || async {
                self.metrics.record_fetch();
                let response = self
                    .client
                    .get(&url)
                    .query(&[("v", cache_buster())])
                    .header(CACHE_CONTROL, "no-cache")
                    .send()
                    .await?;

                let status = response.status();
                if !status.is_success() {
                    return Err(FetchError::Status(status));
                }

                let body = response.text().await?;
                self.parse(&body)
            },
            FetchError::is_retryable,
        )
        .await
    }

    /// Parse a dictionary body with this store's leniency setting.
    pub fn parse(&self, body: &str) -> Result<Dictionary, FetchError> {
        let dictionary = if self.lenient {
            Dictionary::from_jsonc(body)?
        } else {
            Dictionary::from_json(body)?
        };
        Ok(dictionary)
    }
}

/// Query value that defeats intermediate HTTP caches.
fn cache_buster() -> String {
    chrono::Utc::now().timestamp_millis().to_string()
}
