//! Metered gate: the control flow every metered entry point runs before
//! calling the expensive downstream operation.
//!
//! Order matters. The regeneration check runs before the debit so a blocked
//! regeneration never costs credits, and the regeneration counter only moves
//! after a successful debit.

use std::future::Future;

use serde::Serialize;

use credit_governor_core::{AccountId, ContentFingerprint, GateDenial};
use credit_governor_store::StoreError;

use crate::config::GovernorConfig;
use crate::error::{GovernorError, Result};
use crate::ledger::CreditLedger;
use crate::trial::TrialGrantor;

/// Result of asking the gate for permission.
#[derive(Debug)]
pub enum GateDecision {
    /// The units were debited; run the operation, then settle the permit.
    Granted(MeteredPermit),

    /// The operation must not run.
    Denied(GateDenial),
}

impl GateDecision {
    /// Whether the operation may run.
    #[must_use]
    pub const fn is_granted(&self) -> bool {
        matches!(self, Self::Granted(_))
    }
}

/// Proof of a successful debit for one metered operation.
///
/// Settle it with `commit` once the operation succeeded or `refund` if it
/// failed. Dropping an unsettled permit keeps the debit and logs a warning.
#[derive(Debug)]
#[must_use = "settle the permit with commit() or refund()"]
pub struct MeteredPermit {
    /// Account that was debited.
    pub account: AccountId,
    /// Units debited.
    pub units: i64,
    /// Fingerprint of the metered content.
    pub fingerprint: ContentFingerprint,
    /// Generations of this content in the current window, this one included.
    pub generation: i64,
    /// Balance after the debit.
    pub remaining: i64,
    /// Units left today, when a daily cap is configured.
    pub daily_remaining: Option<i64>,
    settled: bool,
}

impl MeteredPermit {
    /// The operation succeeded; keep the debit.
    pub fn commit(mut self) {
        self.settled = true;
        tracing::debug!(
            account = %self.account,
            units = self.units,
            fingerprint = %self.fingerprint,
            "Metered operation committed"
        );
    }

    /// The operation failed downstream; give the units back.
    ///
    /// Consumes the permit, so a debit is refunded at most once. The daily
    /// usage and regeneration counters are not rolled back.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable; the credits are then lost
    /// and the failure is logged with the amount for manual correction.
    pub async fn refund(mut self, gate: &MeteredGate) -> Result<i64> {
        self.settled = true;
        match gate.ledger.refund(&self.account, self.units).await {
            Ok(balance) => Ok(balance),
            Err(err) => {
                tracing::error!(
                    account = %self.account,
                    units = self.units,
                    error = %err,
                    "Refund failed"
                );
                Err(err)
            }
        }
    }
}

impl Drop for MeteredPermit {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!(
                account = %self.account,
                units = self.units,
                "Metered permit dropped without commit or refund"
            );
        }
    }
}

/// Balance and daily allowance as shown to the account holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditStatus {
    /// Current balance.
    pub balance: i64,
    /// Units left today; `None` when no daily cap is configured.
    pub daily_remaining: Option<i64>,
    /// Configured daily cap.
    pub daily_cap: Option<i64>,
}

/// Trial grant, regeneration check, debit and regeneration count in one call.
#[derive(Clone)]
pub struct MeteredGate {
    ledger: CreditLedger,
    trial: TrialGrantor,
    config: GovernorConfig,
}

impl MeteredGate {
    /// Create a gate over a ledger and trial grantor.
    #[must_use]
    pub fn new(ledger: CreditLedger, trial: TrialGrantor, config: GovernorConfig) -> Self {
        Self {
            ledger,
            trial,
            config,
        }
    }

    /// Ask permission to run one metered operation over `content`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or a round trip exceeds the
    /// configured store timeout. The caller must not run the operation then.
    pub async fn authorize(
        &self,
        account: &AccountId,
        content: &str,
        units: i64,
    ) -> Result<GateDecision> {
        self.bounded(
            "ensure_trial",
            self.trial.ensure_trial(account, self.config.trial_credits),
        )
        .await?;

        let fingerprint = ContentFingerprint::of(content);
        let max = self.config.max_generations_per_content;
        let used = self
            .bounded(
                "regen_count",
                self.ledger.quota().regen_count(account, &fingerprint),
            )
            .await?;

        if used >= max {
            tracing::warn!(
                account = %account,
                fingerprint = %fingerprint,
                used,
                max,
                "Regeneration limit reached"
            );
            return Ok(GateDecision::Denied(GateDenial::RegenerationLimit {
                used,
                max,
            }));
        }

        let outcome = self
            .bounded(
                "try_debit",
                self.ledger.try_debit(account, units, self.config.daily_cap),
            )
            .await?;

        if let Some(denial) = GateDenial::from_debit(&outcome) {
            return Ok(GateDecision::Denied(denial));
        }

        let generation = self
            .bounded(
                "increment_regen",
                self.ledger
                    .quota()
                    .increment_regen(account, &fingerprint, self.config.regen_window),
            )
            .await?;

        Ok(GateDecision::Granted(MeteredPermit {
            account: account.clone(),
            units,
            fingerprint,
            generation,
            remaining: outcome.remaining,
            daily_remaining: outcome.daily_remaining,
            settled: false,
        }))
    }

    /// Current balance and daily allowance, granting the trial on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or times out.
    pub async fn status(&self, account: &AccountId) -> Result<CreditStatus> {
        let grant = self
            .bounded(
                "ensure_trial",
                self.trial.ensure_trial(account, self.config.trial_credits),
            )
            .await?;

        let daily_remaining = match self.config.daily_cap {
            Some(cap) => Some(
                self.bounded(
                    "daily_remaining",
                    self.ledger.quota().daily_remaining(account, cap),
                )
                .await?,
            ),
            None => None,
        };

        Ok(CreditStatus {
            balance: grant.balance,
            daily_remaining,
            daily_cap: self.config.daily_cap,
        })
    }

    /// The ledger behind this gate.
    #[must_use]
    pub fn ledger(&self) -> &CreditLedger {
        &self.ledger
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let after = self.config.store_timeout;
        tokio::time::timeout(after, fut).await.unwrap_or_else(|_| {
            tracing::warn!(
                operation,
                after_ms = after.as_millis(),
                "Store call timed out; failing closed"
            );
            Err(GovernorError::Store(StoreError::Timeout { operation, after }))
        })
    }
}
