//! Audit translations binary - checks every dictionary against the default one
//!
//! Usage:
//!   cargo run --bin audit-translations                   # Fetch from SITE_BASE_URL
//!   cargo run --bin audit-translations -- --dir assets/i18n  # Read local files
//!
//! Optional environment variables:
//! - SITE_BASE_URL (defaults to http://localhost:8888)
//! - I18N_LENIENT_JSON (defaults to true)
//! - I18N_DEFAULT_LANG (defaults to en)
//!
//! Exits with a non-zero status when any dictionary is missing keys.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use tracing::info;
use vxn_site::config::Config;
use vxn_site::i18n::{
    Dictionary, DictionaryValidator, Language, LanguageRegistry, TranslationStore,
};

enum Source {
    Remote(TranslationStore),
    Local { dir: PathBuf, store: TranslationStore },
}

impl Source {
    async fn load(&self, lang: &str) -> Result<Dictionary> {
        match self {
            Source::Remote(store) => store
                .fetch(lang)
                .await
                .with_context(|| format!("Failed to fetch '{}' dictionary", lang)),
            Source::Local { dir, store } => {
                let path = dir.join(format!("{}.json", lang));
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                store
                    .parse(&text)
                    .with_context(|| format!("Failed to parse {}", path.display()))
            }
        }
    }
}

fn local_dir() -> Result<Option<PathBuf>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.as_slice() {
        [] => Ok(None),
        [flag, dir] if flag == "--dir" => Ok(Some(PathBuf::from(dir))),
        _ => bail!("Usage: audit-translations [--dir <path>]"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vxn_site=warn".parse()?)
                .add_directive("audit_translations=info".parse()?),
        )
        .init();

    let config = Config::from_env()?;
    let store = TranslationStore::new(reqwest::Client::new(), config.site_base_url.clone())
        .with_lenient_parsing(config.i18n_lenient_json);

    let source = match local_dir()? {
        Some(dir) => {
            info!("Auditing dictionaries in {}", dir.display());
            Source::Local { dir, store }
        }
        None => {
            info!("Auditing dictionaries from {}", config.site_base_url);
            Source::Remote(store)
        }
    };

    let default_language = config.default_language;
    let default = source.load(default_language.code()).await?;
    println!(
        "{} ({}): {} keys",
        default_language.name(),
        default_language.code(),
        default.len()
    );

    let mut failed = Vec::new();
    for language in LanguageRegistry::get().list_enabled() {
        if language.code == default_language.code() {
            continue;
        }
        let language = Language::from_code(language.code)?;
        let target = source.load(language.code()).await?;
        let report = DictionaryValidator::validate(&default, &target);

        println!();
        println!(
            "{} ({}): {} keys, {} errors, {} warnings",
            language.native_name(),
            language.code(),
            target.len(),
            report.errors.len(),
            report.warnings.len()
        );
        for error in &report.errors {
            println!("  error: {}", error);
        }
        for warning in &report.warnings {
            println!("  warning: {}", warning);
        }

        if report.has_errors() {
            failed.push(language.code());
        }
    }

    if !failed.is_empty() {
        bail!("Dictionaries with missing keys: {}", failed.join(", "));
    }

    info!("All dictionaries cover the default language");
    Ok(())
}
