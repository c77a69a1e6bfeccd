//! Credit status handler.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use credit_governor_core::AccountId;

use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// Credit status of an account.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditsResponse {
    /// Current balance.
    pub credits: i64,
    /// Units left today; absent when no daily cap is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_remaining: Option<i64>,
    /// Configured daily cap.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_cap: Option<i64>,
}

/// Parse an account id from a path segment.
pub(crate) fn parse_account(raw: &str) -> Result<AccountId, ApiError> {
    AccountId::new(raw).map_err(|e| ApiError::BadRequest(format!("invalid account id: {e}")))
}

/// Get the credit status of an account, granting its trial on first access.
pub async fn get_credits(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
    Path(account): Path<String>,
) -> Result<Json<CreditsResponse>, ApiError> {
    let account = parse_account(&account)?;

    let status = state.governor.gate().status(&account).await?;

    tracing::debug!(
        service = %auth.service_name,
        account = %account,
        balance = status.balance,
        "Credit status read"
    );

    Ok(Json(CreditsResponse {
        credits: status.balance,
        daily_remaining: status.daily_remaining,
        daily_cap: status.daily_cap,
    }))
}
