//! Health check handler.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: &'static str,
    /// Service name.
    pub service: &'static str,
    /// Service version.
    pub version: &'static str,
    /// Counter store backend.
    pub store: String,
    /// Whether Stripe webhooks can be verified.
    pub webhooks_enabled: bool,
}

/// Liveness only; the store is not contacted.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        store: state.governor.store_name().to_string(),
        webhooks_enabled: state.config.stripe_webhook_secret.is_some(),
    })
}
