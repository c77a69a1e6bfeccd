//! Payment confirmation events and their failure records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountId, EventId};

/// Kind of inbound payment event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentEventKind {
    /// A checkout completed and its credits should be awarded.
    CheckoutCompleted,

    /// Any other event type from the payment provider; acknowledged, no award.
    Other(String),
}

/// A payment event as delivered by the payment provider.
///
/// Account and credit amount are optional because the provider payload is
/// not under our control; a confirmed event without them is malformed and is
/// dropped rather than retried.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEvent {
    /// Provider event id, unique per event and stable across redeliveries.
    pub id: EventId,

    /// What happened.
    pub kind: PaymentEventKind,

    /// Account to credit.
    pub account: Option<AccountId>,

    /// Credits purchased.
    pub credits: Option<i64>,

    /// Raw provider payload, kept for dead-letter records.
    pub payload: serde_json::Value,
}

impl PaymentEvent {
    /// Create a checkout-completed event.
    #[must_use]
    pub fn checkout_completed(id: EventId, account: AccountId, credits: i64) -> Self {
        Self {
            id,
            kind: PaymentEventKind::CheckoutCompleted,
            account: Some(account),
            credits: Some(credits),
            payload: serde_json::Value::Null,
        }
    }

    /// Attach the raw provider payload.
    #[must_use]
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// Account and amount to award, if both are present and the amount is positive.
    #[must_use]
    pub fn award_target(&self) -> Option<(&AccountId, i64)> {
        let account = self.account.as_ref()?;
        let credits = self.credits.filter(|c| *c > 0)?;
        Some((account, credits))
    }
}

/// A failed award, kept for manual reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetterRecord {
    /// The payment event that failed.
    pub event_id: EventId,

    /// Account that should have been credited.
    pub account: AccountId,

    /// Credits that should have been awarded.
    pub amount: i64,

    /// Failure message from the award attempt.
    pub error: String,

    /// Raw provider payload.
    pub payload: serde_json::Value,

    /// When the award failed.
    pub failed_at: DateTime<Utc>,
}
