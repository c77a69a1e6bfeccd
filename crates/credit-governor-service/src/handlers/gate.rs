//! Metered gate handlers for calling services.
//!
//! A caller asks for permission before running an expensive operation and
//! gives the units back if the operation fails. The permit is committed as
//! soon as it is handed out; the refund endpoint is the only way back. Each
//! refund carries a caller-chosen operation id and is applied at most once, so
//! callers may retry it freely.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use credit_governor_core::OperationId;
use credit_governor_engine::GateDecision;

use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::handlers::credits::parse_account;
use crate::state::AppState;

fn default_units() -> i64 {
    1
}

/// Request to run one metered operation.
#[derive(Debug, Deserialize)]
pub struct AuthorizeRequest {
    /// Account to debit.
    pub account: String,
    /// Content the operation runs on; identifies regenerations.
    pub content: String,
    /// Units to debit (default 1).
    #[serde(default = "default_units")]
    pub units: i64,
}

/// Granted permission.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeResponse {
    /// Always true; denials are returned as errors.
    pub granted: bool,
    /// Balance after the debit.
    pub remaining: i64,
    /// Units left today.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_remaining: Option<i64>,
    /// Content fingerprint.
    pub fingerprint: String,
    /// Generations of this content in the current window.
    pub generation: i64,
}

/// Debit units for one operation, or explain why it must not run.
pub async fn authorize(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
    Json(req): Json<AuthorizeRequest>,
) -> Result<Json<AuthorizeResponse>, ApiError> {
    let account = parse_account(&req.account)?;

    match state
        .governor
        .gate()
        .authorize(&account, &req.content, req.units)
        .await?
    {
        GateDecision::Granted(permit) => {
            let response = AuthorizeResponse {
                granted: true,
                remaining: permit.remaining,
                daily_remaining: permit.daily_remaining,
                fingerprint: permit.fingerprint.to_string(),
                generation: permit.generation,
            };
            tracing::info!(
                service = %auth.service_name,
                account = %account,
                units = req.units,
                remaining = response.remaining,
                "Metered operation authorized"
            );
            permit.commit();
            Ok(Json(response))
        }
        GateDecision::Denied(denial) => {
            tracing::info!(
                service = %auth.service_name,
                account = %account,
                reason = denial.reason(),
                "Metered operation denied"
            );
            Err(ApiError::Denied(denial))
        }
    }
}

/// Units to give back after a failed operation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundRequest {
    /// Account that was debited.
    pub account: String,
    /// Units debited for the failed operation.
    pub units: i64,
    /// Identifies the failed operation; a repeated id is not refunded again.
    pub operation_id: String,
}

/// Balance after a refund.
#[derive(Debug, Serialize)]
pub struct RefundResponse {
    /// Current balance.
    pub balance: i64,
    /// Set when the operation had already been refunded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotent: Option<bool>,
}

/// Refund the units of a failed operation.
pub async fn refund(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
    Json(req): Json<RefundRequest>,
) -> Result<Json<RefundResponse>, ApiError> {
    let account = parse_account(&req.account)?;
    let operation = OperationId::new(req.operation_id)
        .map_err(|e| ApiError::BadRequest(format!("invalid operation id: {e}")))?;
    let ledger = state.governor.ledger();

    let refunded = ledger
        .refund_once(
            &account,
            req.units,
            &operation,
            state.governor.config().processed_event_ttl,
        )
        .await?;

    let Some(balance) = refunded else {
        let balance = ledger.balance(&account).await?;
        return Ok(Json(RefundResponse {
            balance,
            idempotent: Some(true),
        }));
    };

    tracing::info!(
        service = %auth.service_name,
        account = %account,
        operation = %operation,
        units = req.units,
        balance,
        "Metered operation refunded"
    );

    Ok(Json(RefundResponse {
        balance,
        idempotent: None,
    }))
}
