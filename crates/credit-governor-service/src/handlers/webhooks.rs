//! Stripe webhook handler.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use credit_governor_engine::ProcessOutcome;

use crate::error::ApiError;
use crate::state::AppState;
use crate::stripe::{verify_signature, StripeEvent};

/// Webhook response.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    /// Whether the webhook was accepted.
    pub received: bool,
    /// Set when the event had already been processed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotent: Option<bool>,
}

/// Handle Stripe webhooks.
///
/// Any non-2xx response makes Stripe redeliver the event. Bad signatures and
/// unparsable bodies get 400; a store outage before the event is claimed gets
/// 503; a failed award gets 500 after the event is dead-lettered.
pub async fn stripe_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<WebhookResponse>, ApiError> {
    let Some(secret) = state.config.stripe_webhook_secret.as_deref() else {
        tracing::warn!("Stripe webhook received but STRIPE_WEBHOOK_SECRET is not set");
        return Err(ApiError::BadRequest("Webhook not configured".into()));
    };

    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest("Missing Stripe signature".into()))?;

    verify_signature(
        &body,
        signature,
        secret,
        state.config.stripe_signature_tolerance,
        Utc::now(),
    )
    .map_err(|e| {
        tracing::warn!(error = %e, "Invalid Stripe webhook signature");
        ApiError::BadRequest("Invalid webhook signature".into())
    })?;

    let event: StripeEvent =
        serde_json::from_str(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    tracing::info!(
        event_type = %event.event_type,
        event_id = %event.id,
        "Received Stripe webhook"
    );

    let payment = event
        .into_payment_event()
        .map_err(|e| ApiError::BadRequest(format!("invalid event id: {e}")))?;

    let outcome = state.governor.payments().process(&payment).await?;

    Ok(Json(WebhookResponse {
        received: true,
        idempotent: matches!(outcome, ProcessOutcome::Duplicate).then_some(true),
    }))
}
