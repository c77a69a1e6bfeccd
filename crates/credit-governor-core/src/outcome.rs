//! Structured results of governor operations.
//!
//! Expected business outcomes (not enough credits, quota reached) are values,
//! not errors. Errors are reserved for infrastructure faults.

use serde::{Deserialize, Serialize};

/// Why a debit was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DebitRejection {
    /// The balance is lower than the requested amount.
    InsufficientCredits,

    /// Today's usage leaves less room than the requested amount.
    DailyCapExceeded,
}

impl DebitRejection {
    /// Wire name of the rejection reason.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InsufficientCredits => "insufficient-credits",
            Self::DailyCapExceeded => "daily-cap-exceeded",
        }
    }
}

/// Result of a debit attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebitOutcome {
    /// Whether the units were debited.
    pub ok: bool,

    /// Balance after the attempt.
    pub remaining: i64,

    /// Units left under the daily cap, when a cap applies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_remaining: Option<i64>,

    /// Why the debit was refused, if it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DebitRejection>,
}

impl DebitOutcome {
    /// A successful debit.
    #[must_use]
    pub const fn approved(remaining: i64, daily_remaining: Option<i64>) -> Self {
        Self {
            ok: true,
            remaining,
            daily_remaining,
            reason: None,
        }
    }

    /// A debit refused because the balance is too low.
    #[must_use]
    pub const fn insufficient(balance: i64) -> Self {
        Self {
            ok: false,
            remaining: balance,
            daily_remaining: None,
            reason: Some(DebitRejection::InsufficientCredits),
        }
    }

    /// A debit refused by the daily cap pre-check.
    #[must_use]
    pub const fn daily_cap_exceeded(balance: i64, daily_remaining: i64) -> Self {
        Self {
            ok: false,
            remaining: balance,
            daily_remaining: Some(daily_remaining),
            reason: Some(DebitRejection::DailyCapExceeded),
        }
    }
}

/// Result of a trial grant attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialGrant {
    /// Whether this call awarded the trial.
    pub granted: bool,

    /// Balance after the call.
    pub balance: i64,
}

/// Why the metered gate refused an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum GateDenial {
    /// Not enough credits; route the user to a top-up flow.
    InsufficientCredits {
        /// Current balance.
        remaining: i64,
    },

    /// Today's cap is reached; retry tomorrow.
    DailyCapExceeded {
        /// Current balance.
        remaining: i64,
        /// Units left today.
        daily_remaining: i64,
    },

    /// This content has been generated too often within the window.
    RegenerationLimit {
        /// Generations already recorded for the content.
        used: i64,
        /// Allowed generations per window.
        max: i64,
    },
}

impl GateDenial {
    /// Wire name of the denial reason.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::InsufficientCredits { .. } => "insufficient-credits",
            Self::DailyCapExceeded { .. } => "daily-cap-exceeded",
            Self::RegenerationLimit { .. } => "regeneration-limit",
        }
    }

    /// Whether the denial is a quota that clears on its own (rate limited)
    /// rather than a missing payment.
    #[must_use]
    pub const fn is_rate_limited(&self) -> bool {
        matches!(
            self,
            Self::DailyCapExceeded { .. } | Self::RegenerationLimit { .. }
        )
    }

    /// Convert a refused debit into a gate denial.
    ///
    /// Returns `None` for an approved outcome.
    #[must_use]
    pub fn from_debit(outcome: &DebitOutcome) -> Option<Self> {
        match outcome.reason? {
            DebitRejection::InsufficientCredits => Some(Self::InsufficientCredits {
                remaining: outcome.remaining,
            }),
            DebitRejection::DailyCapExceeded => Some(Self::DailyCapExceeded {
                remaining: outcome.remaining,
                daily_remaining: outcome.daily_remaining.unwrap_or(0),
            }),
        }
    }
}
