//! Webhook HTTP surface
//!
//! Telegram redelivers updates that do not get a 2xx answer, so every request
//! is acknowledged with an empty `200 OK` whatever happened while handling it.
//! The actual reply goes out through the Bot API.

use crate::orchestrator::ResponseOrchestrator;
use crate::update::IncomingUpdate;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

/// Shared state of the webhook handler
#[derive(Clone)]
pub struct WebhookState {
    /// `None` when no bot token is configured
    orchestrator: Option<Arc<ResponseOrchestrator>>,
}

impl WebhookState {
    /// State that handles updates with `orchestrator`
    #[must_use]
    pub const fn new(orchestrator: Arc<ResponseOrchestrator>) -> Self {
        Self {
            orchestrator: Some(orchestrator),
        }
    }

    /// State that acknowledges every update without processing it
    #[must_use]
    pub const fn unconfigured() -> Self {
        Self { orchestrator: None }
    }
}

/// Build the webhook router serving updates on `path`
pub fn webhook_router(state: WebhookState, path: &str) -> Router {
    Router::new()
        .route(path, post(handle_webhook))
        .route("/healthz", get(liveness))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn handle_webhook(State(state): State<WebhookState>, body: Bytes) -> StatusCode {
    let Some(orchestrator) = state.orchestrator.as_ref() else {
        debug!("Bot token is not configured, update ignored");
        return StatusCode::OK;
    };

    let update: IncomingUpdate = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            warn!(body_len = body.len(), "Malformed update: {}", e);
            return StatusCode::OK;
        }
    };

    orchestrator.handle_update(&update).await;
    StatusCode::OK
}

async fn liveness() -> StatusCode {
    StatusCode::OK
}
