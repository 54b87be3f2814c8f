use anyhow::{Context, Result};

use crate::captcha::DEFAULT_VERIFY_URL;
use crate::i18n::Language;

#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub port: u16,

    // reCAPTCHA
    pub recaptcha_secret: Option<String>,
    pub recaptcha_verify_url: String,

    // i18n
    pub site_base_url: String,
    pub i18n_lenient_json: bool,
    pub default_language: Language,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let default_language = match std::env::var("I18N_DEFAULT_LANG") {
            Ok(code) if !code.trim().is_empty() => Language::from_code(code.trim())
                .context("I18N_DEFAULT_LANG is not a supported language")?,
            _ => Language::default_language(),
        };

        Ok(Self {
            // Server
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8888),

            // reCAPTCHA - an unset secret is reported per request, not at startup
            recaptcha_secret: std::env::var("RECAPTCHA_SECRET")
                .ok()
                .filter(|v| !v.is_empty()),
            recaptcha_verify_url: std::env::var("RECAPTCHA_VERIFY_URL")
                .unwrap_or_else(|_| DEFAULT_VERIFY_URL.to_string()),

            // i18n
            site_base_url: std::env::var("SITE_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8888".to_string()),
            i18n_lenient_json: std::env::var("I18N_LENIENT_JSON")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            default_language,
        })
    }
}
