//! HTTP surface: the reCAPTCHA relay and a health check.

use anyhow::{Context, Result};
use axum::{
    routing::{any, get},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::captcha::{verify_recaptcha, RelayState};
use crate::config::Config;

pub const VERIFY_PATH: &str = "/api/verify-recaptcha";

/// Path the static host exposes the function under.
pub const FUNCTION_VERIFY_PATH: &str = "/.netlify/functions/verify-recaptcha";

pub fn create_router(state: RelayState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(VERIFY_PATH, any(verify_recaptcha))
        .route(FUNCTION_VERIFY_PATH, any(verify_recaptcha))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Bind `0.0.0.0:{port}` and serve until the process stops.
pub async fn run(config: &Config) -> Result<()> {
    let state = RelayState::new(
        reqwest::Client::new(),
        config.recaptcha_secret.clone(),
        config.recaptcha_verify_url.clone(),
    );
    if !state.has_secret() {
        info!("RECAPTCHA_SECRET not set; verification requests will fail");
    }

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on {}", addr);

    axum::serve(listener, create_router(state))
        .await
        .context("Failed to serve application")?;

    Ok(())
}
