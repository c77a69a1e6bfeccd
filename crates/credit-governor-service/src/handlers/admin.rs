//! Dead-letter administration.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use credit_governor_core::{DeadLetterRecord, EventId};

use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// Result of resolving a dead letter.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveResponse {
    /// The resolved event.
    pub event_id: EventId,
    /// Balance after the award.
    pub balance: i64,
}

fn parse_event_id(raw: &str) -> Result<EventId, ApiError> {
    EventId::new(raw).map_err(|e| ApiError::BadRequest(format!("invalid event id: {e}")))
}

/// Read the dead-letter record of a payment event.
pub async fn get_dead_letter(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Path(event_id): Path<String>,
) -> Result<Json<DeadLetterRecord>, ApiError> {
    let event_id = parse_event_id(&event_id)?;

    state
        .governor
        .payments()
        .dead_letter(&event_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no dead letter for event {event_id}")))
}

/// Award the credits of a dead-lettered event and clear the record.
pub async fn resolve_dead_letter(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
    Path(event_id): Path<String>,
) -> Result<Json<ResolveResponse>, ApiError> {
    let event_id = parse_event_id(&event_id)?;

    let balance = state
        .governor
        .payments()
        .resolve_dead_letter(&event_id)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!("no unresolved dead letter for event {event_id}"))
        })?;

    tracing::info!(
        service = %auth.service_name,
        event_id = %event_id,
        balance,
        "Dead letter resolved by operator"
    );

    Ok(Json(ResolveResponse { event_id, balance }))
}
