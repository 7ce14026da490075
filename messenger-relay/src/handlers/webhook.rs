//! Messenger webhook endpoints.
//!
//! `GET /webhook` answers the subscription handshake; `POST /webhook` accepts
//! message deliveries. The platform expects a quick plain-text acknowledgement,
//! so per-message failures never change the response.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use secrecy::ExposeSecret;
use serde_json::Value;
use service_core::utils::tokens_match;
use thiserror::Error;

use crate::models::{IncomingPayload, PAGE_OBJECT};
use crate::startup::AppState;

const SUBSCRIBE_MODE: &str = "subscribe";

/// Handshake query parameters.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct VerifyParams {
    pub mode: Option<String>,
    pub verify_token: Option<String>,
    pub challenge: Option<String>,
}

impl VerifyParams {
    /// Pick the handshake keys out of raw query pairs. A repeated key keeps
    /// its first value.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "hub.mode" => &mut params.mode,
                "hub.verify_token" => &mut params.verify_token,
                "hub.challenge" => &mut params.challenge,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        params
    }
}

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Webhook verification failed")]
    VerificationFailed,

    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    #[error("Webhook body is not a JSON object")]
    NotAnObject,
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match self {
            WebhookError::VerificationFailed => StatusCode::FORBIDDEN,
            WebhookError::InvalidPayload(_) | WebhookError::NotAnObject => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, "Error").into_response()
    }
}

/// Echo `hub.challenge` when the mode is `subscribe` and the token matches.
#[tracing::instrument(skip_all)]
pub async fn verify_webhook(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<String, WebhookError> {
    let params = VerifyParams::from_pairs(pairs);
    let token_ok = match (
        &state.config.messenger.verify_token,
        params.verify_token.as_deref(),
    ) {
        (Some(expected), Some(presented)) => tokens_match(expected.expose_secret(), presented),
        _ => false,
    };

    if params.mode.as_deref() == Some(SUBSCRIBE_MODE) && token_ok {
        tracing::info!("Webhook verified");
        return Ok(params.challenge.unwrap_or_default());
    }

    tracing::error!(
        mode = ?params.mode,
        token_present = params.verify_token.is_some(),
        "Webhook verification failed"
    );
    Err(WebhookError::VerificationFailed)
}

/// Accept a webhook delivery and relay each message in it.
#[tracing::instrument(skip_all, fields(body_len = body.len()))]
pub async fn receive_webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<&'static str, WebhookError> {
    let value: Value = serde_json::from_slice(&body).map_err(|e| {
        tracing::error!(error = %e, "Webhook body is not valid JSON");
        WebhookError::from(e)
    })?;

    let Value::Object(fields) = &value else {
        tracing::error!("Webhook body is not a JSON object");
        return Err(WebhookError::NotAnObject);
    };

    let object = fields.get("object").and_then(Value::as_str);
    if object != Some(PAGE_OBJECT) {
        tracing::debug!(object = ?object, "Ignoring non-page webhook delivery");
        return Ok("OK");
    }

    let payload: IncomingPayload = serde_json::from_value(value).map_err(|e| {
        tracing::error!(error = %e, "Unexpected webhook payload shape");
        WebhookError::from(e)
    })?;

    let outcomes = state.relay.relay_payload(&payload).await;
    tracing::info!(events = outcomes.len(), "Webhook delivery processed");

    Ok("OK")
}
