//! reCAPTCHA verification relay.
//!
//! Forwards a client token, the server-held secret and the caller's IP to
//! the verification service and reports `{success, errorCodes}` back. The
//! secret and upstream error details never reach the caller.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

/// Google's verification endpoint.
pub const DEFAULT_VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Missing RECAPTCHA_SECRET")]
    MissingSecret,

    #[error("Missing token")]
    MissingToken,

    #[error("Request body is not valid JSON: {0}")]
    MalformedBody(#[from] serde_json::Error),

    #[error("Verification request failed: {0}")]
    Upstream(#[from] reqwest::Error),
}

impl RelayError {
    fn status(&self) -> StatusCode {
        match self {
            RelayError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            RelayError::MissingToken => StatusCode::BAD_REQUEST,
            RelayError::MissingSecret | RelayError::MalformedBody(_) | RelayError::Upstream(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to show the caller.
    fn public_message(&self) -> &'static str {
        match self {
            RelayError::MethodNotAllowed => "Method not allowed",
            RelayError::MissingSecret => "Missing RECAPTCHA_SECRET",
            RelayError::MissingToken => "Missing token",
            RelayError::MalformedBody(_) | RelayError::Upstream(_) => "Verification failed",
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!("reCAPTCHA relay failed: {}", self);
        } else {
            debug!("reCAPTCHA relay rejected request: {}", self);
        }

        let body = Json(json!({
            "success": false,
            "error": self.public_message(),
        }));

        (status, body).into_response()
    }
}

/// Result reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResponse {
    pub success: bool,
    pub error_codes: Vec<String>,
}

impl VerificationResponse {
    /// Read the verification service's reply; anything unexpected counts
    /// as a failed verification.
    fn from_upstream(data: &Value) -> Self {
        let error_codes = data
            .get("error-codes")
            .and_then(Value::as_array)
            .map(|codes| {
                codes
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            success: data.get("success").is_some_and(is_truthy),
            error_codes,
        }
    }
}

/// Shared state of the relay handler.
#[derive(Clone)]
pub struct RelayState {
    client: reqwest::Client,
    secret: Option<String>,
    verify_url: String,
}

impl std::fmt::Debug for RelayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayState")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("verify_url", &self.verify_url)
            .finish()
    }
}

impl RelayState {
    pub fn new(client: reqwest::Client, secret: Option<String>, verify_url: impl Into<String>) -> Self {
        Self {
            client,
            secret: secret.filter(|s| !s.is_empty()),
            verify_url: verify_url.into(),
        }
    }

    pub fn has_secret(&self) -> bool {
        self.secret.is_some()
    }

    /// Ask the verification service about `token`.
    pub async fn verify(
        &self,
        token: &str,
        remote_ip: Option<&str>,
    ) -> Result<VerificationResponse, RelayError> {
        let secret = self.secret.as_deref().ok_or(RelayError::MissingSecret)?;

        let mut form = vec![("secret", secret), ("response", token)];
        if let Some(ip) = remote_ip.filter(|ip| !ip.is_empty()) {
            form.push(("remoteip", ip));
        }

        let response = self
            .client
            .post(&self.verify_url)
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let data: Value = serde_json::from_str(&body).unwrap_or_else(|_| {
            warn!("Verification service returned a non-JSON body (status {})", status);
            json!({})
        });

        let result = VerificationResponse::from_upstream(&data);
        debug!(
            "Verification result: success={}, error codes {:?}",
            result.success, result.error_codes
        );
        Ok(result)
    }
}

/// `POST` handler: `{ "token": "..." }` → `{ "success": bool, "errorCodes": [...] }`.
pub async fn verify_recaptcha(
    State(state): State<RelayState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<VerificationResponse>, RelayError> {
    if method != Method::POST {
        return Err(RelayError::MethodNotAllowed);
    }
    if !state.has_secret() {
        return Err(RelayError::MissingSecret);
    }

    let token = extract_token(&body)?.ok_or(RelayError::MissingToken)?;
    let remote_ip = remote_ip(&headers);

    let result = state.verify(&token, remote_ip.as_deref()).await?;
    Ok(Json(result))
}

/// Token from a JSON request body; an empty body reads as `{}`, while a
/// whitespace-only one is malformed.
///
/// Falsy tokens (`null`, `false`, `0`, `""`) count as missing; other
/// non-string values are forwarded as their JSON text.
fn extract_token(body: &[u8]) -> Result<Option<String>, RelayError> {
    if body.is_empty() {
        return Ok(None);
    }

    let payload: Value = serde_json::from_slice(body)?;
    if payload.is_null() {
        // Destructuring `null` is a malformed request, not a missing token.
        return Err(RelayError::MalformedBody(serde::de::Error::custom(
            "request body is null",
        )));
    }

    let token = match payload.get("token") {
        Some(value) if is_truthy(value) => match value {
            Value::String(token) => Some(token.clone()),
            other => Some(other.to_string()),
        },
        _ => None,
    };
    Ok(token)
}

/// Client IP from `x-forwarded-for`, else `client-ip`.
fn remote_ip(headers: &HeaderMap) -> Option<String> {
    ["x-forwarded-for", "client-ip"]
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|value| value.to_str().ok())
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_owned)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
