//! Error types for the counter store.

use std::time::Duration;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur talking to the counter store.
///
/// Every variant is an infrastructure fault. Callers gating an expensive
/// operation must treat any of them as "outcome unknown" and fail closed.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Could not reach the store.
    #[error("connection error: {0}")]
    Connection(String),

    /// The store did not answer in time.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        /// The operation that timed out.
        operation: &'static str,
        /// The bound that was exceeded.
        after: Duration,
    },

    /// The store rejected a command (wrong type, script error, ...).
    #[error("command error: {0}")]
    Command(String),

    /// A stored value could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid adapter configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl StoreError {
    /// Whether retrying the same call later may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout { .. })
    }
}

#[cfg(feature = "redis-backend")]
impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() || err.is_connection_dropped() || err.is_io_error() {
            Self::Connection(err.to_string())
        } else if err.is_timeout() {
            Self::Timeout {
                operation: "redis",
                after: Duration::ZERO,
            }
        } else {
            Self::Command(err.to_string())
        }
    }
}
