//! Error types for governor operations.

use credit_governor_core::{EventId, IdError};
use credit_governor_store::StoreError;

/// Result type for governor operations.
pub type Result<T> = std::result::Result<T, GovernorError>;

/// Errors raised by the governor.
///
/// Business outcomes (insufficient credits, quota reached) are never errors;
/// they come back as `DebitOutcome` / `GateDecision` values.
#[derive(Debug, thiserror::Error)]
pub enum GovernorError {
    /// The counter store failed or timed out. The outcome of the call is unknown.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Amounts must be strictly positive.
    #[error("invalid amount: {0}")]
    InvalidAmount(i64),

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),

    /// Awarding a payment event failed; a dead-letter record was written.
    #[error("award failed for event {event_id}: {message}")]
    AwardFailed {
        /// The payment event whose award failed.
        event_id: EventId,
        /// Failure message.
        message: String,
    },

    /// A stored record could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl GovernorError {
    /// Whether the caller should surface a retryable error.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Store(err) => err.is_retryable(),
            Self::AwardFailed { .. } => true,
            _ => false,
        }
    }
}

pub(crate) fn ensure_positive(amount: i64) -> Result<()> {
    if amount <= 0 {
        return Err(GovernorError::InvalidAmount(amount));
    }
    Ok(())
}
