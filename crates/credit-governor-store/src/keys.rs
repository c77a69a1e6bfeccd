//! Key families for the counter store.
//!
//! All state lives under deterministic string keys derived from identifiers:
//!
//! | family | key |
//! |---|---|
//! | balance | `credits:{account}` |
//! | trial marker | `trial:granted:{account}` |
//! | daily usage | `credits:dailyUsed:{account}:{YYYYMMDD}` |
//! | regeneration | `regen:{account}:{fingerprint}` |
//! | processed event | `stripe:seen_event:{event_id}` |
//! | dead letter | `stripe:dead_letter:{event_id}` |
//! | dead-letter resolution | `stripe:dead_letter_resolved:{event_id}` |
//! | refund operation | `refund:op:{account}:{operation_id}` |
//!
//! Identifiers never contain `:`, so no key of one family can spell a key of
//! another. An optional namespace prefix is prepended to every key so several
//! deployments can share one store.

use chrono::NaiveDate;

use credit_governor_core::{AccountId, ContentFingerprint, EventId, OperationId};

use crate::error::{Result, StoreError};

/// Builds store keys under an optional namespace prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keys {
    prefix: String,
}

impl Keys {
    /// Keys without a namespace prefix.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys under a namespace prefix, e.g. `"staging:"`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Configuration` if the prefix contains anything
    /// other than ASCII alphanumerics, `_` and `:`.
    pub fn with_prefix(prefix: impl Into<String>) -> Result<Self> {
        let prefix = prefix.into();
        if !prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
        {
            return Err(StoreError::Configuration(format!(
                "invalid key prefix '{prefix}': only ASCII alphanumeric, underscore, and colon allowed"
            )));
        }
        Ok(Self { prefix })
    }

    /// The namespace prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Credit balance of an account.
    #[must_use]
    pub fn balance(&self, account: &AccountId) -> String {
        format!("{}credits:{account}", self.prefix)
    }

    /// One-time trial marker of an account.
    #[must_use]
    pub fn trial_marker(&self, account: &AccountId) -> String {
        format!("{}trial:granted:{account}", self.prefix)
    }

    /// Units debited from an account on a UTC calendar day.
    #[must_use]
    pub fn daily_usage(&self, account: &AccountId, day: NaiveDate) -> String {
        format!(
            "{}credits:dailyUsed:{account}:{}",
            self.prefix,
            day.format("%Y%m%d")
        )
    }

    /// Generations recorded for one piece of content.
    #[must_use]
    pub fn regen(&self, account: &AccountId, fingerprint: &ContentFingerprint) -> String {
        format!("{}regen:{account}:{fingerprint}", self.prefix)
    }

    /// Marker for a payment event that has been seen.
    #[must_use]
    pub fn processed_event(&self, event_id: &EventId) -> String {
        format!("{}stripe:seen_event:{event_id}", self.prefix)
    }

    /// Dead-letter record for a payment event whose award failed.
    #[must_use]
    pub fn dead_letter(&self, event_id: &EventId) -> String {
        format!("{}stripe:dead_letter:{event_id}", self.prefix)
    }

    /// Claim on resolving the dead letter of a payment event.
    #[must_use]
    pub fn dead_letter_resolved(&self, event_id: &EventId) -> String {
        format!("{}stripe:dead_letter_resolved:{event_id}", self.prefix)
    }

    /// Marker for a refund operation that has been applied.
    #[must_use]
    pub fn refund_operation(&self, account: &AccountId, operation_id: &OperationId) -> String {
        format!("{}refund:op:{account}:{operation_id}", self.prefix)
    }
}
