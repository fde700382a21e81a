use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{any, post},
    Json, Router,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info_span, warn, Instrument};
use uuid::Uuid;

use crate::auth;
use crate::config::Config;
use crate::format::format_message;
use crate::notifier::{DeliveryOutcome, Notifier, OutboundMessage};
use crate::signal::SignalPayload;

pub const HEALTH_PATH: &str = "/healthz";
pub const WEBHOOK_PATH: &str = "/kvfx/webhook";

/// Shared, read-only state handed to every request
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub fn new(config: Config, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            config: Arc::new(config),
            notifier,
        }
    }
}

/// Terminal failure of a single request.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("missing or invalid token")]
    Unauthorized,
    #[error("request body is not a valid signal payload: {0}")]
    MalformedBody(#[from] serde_json::Error),
    #[error("Telegram delivery failed: {0}")]
    Delivery(String),
    #[error("no such route")]
    NotFound,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "Bad token"),
            Self::MalformedBody(_) => (StatusCode::BAD_REQUEST, "Bad request"),
            Self::Delivery(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Telegram error"),
            Self::NotFound => (StatusCode::NOT_FOUND, "Not found"),
        };

        (status, message).into_response()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    ok: bool,
    has_secret: bool,
    secret_len: usize,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    ok: bool,
}

/// Build the relay router. The health route skips authentication; everything
/// else, the not-found fallback included, requires the shared token.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(HEALTH_PATH, any(health))
        .route(WEBHOOK_PATH, post(webhook).fallback(not_found))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), require_token))
        .with_state(state)
}

async fn require_token(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, RelayError> {
    if req.uri().path() == HEALTH_PATH {
        return Ok(next.run(req).await);
    }

    let token = auth::extract_token(req.uri());
    if !auth::verify(&token, &state.config.webhook.token) {
        return Err(RelayError::Unauthorized);
    }

    Ok(next.run(req).await)
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let secret = &state.config.webhook.token;
    Json(HealthResponse {
        ok: true,
        has_secret: !secret.is_empty(),
        secret_len: auth::js_length(secret),
    })
}

async fn webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<OkResponse>, RelayError> {
    let span = info_span!("webhook", request_id = %Uuid::new_v4());
    relay(&state, &body).instrument(span).await?;
    Ok(Json(OkResponse { ok: true }))
}

/// Parse, format and deliver one alert.
async fn relay(state: &AppState, body: &[u8]) -> Result<(), RelayError> {
    let payload = SignalPayload::from_slice(body).map_err(|e| {
        warn!("Rejecting malformed payload: {}", e);
        RelayError::from(e)
    })?;

    let message = OutboundMessage::html(&state.config.telegram.chat_id, format_message(&payload));

    match state.notifier.send(&message).await {
        Ok(DeliveryOutcome::Delivered) => Ok(()),
        Ok(DeliveryOutcome::Rejected { status }) => {
            Err(RelayError::Delivery(format!("status {}", status)))
        }
        Err(e) => {
            error!("Telegram delivery failed: {:#}", e);
            Err(RelayError::Delivery(e.to_string()))
        }
    }
}

async fn not_found() -> RelayError {
    RelayError::NotFound
}
