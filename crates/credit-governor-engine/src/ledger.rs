//! Credit balances.
//!
//! The ledger is the only writer of balance keys. Awards are unconditional
//! increments; debits go through the store's atomic check-and-decrement, so
//! no interleaving of concurrent debits can drive a balance below zero.

use std::sync::Arc;
use std::time::Duration;

use credit_governor_core::{AccountId, DebitOutcome, OperationId};
use credit_governor_store::{CounterStore, Keys};

use crate::error::{ensure_positive, Result};
use crate::quota::QuotaGovernor;

/// Balance reads, awards, debits and refunds.
#[derive(Clone)]
pub struct CreditLedger {
    store: Arc<dyn CounterStore>,
    keys: Keys,
    quota: QuotaGovernor,
}

impl CreditLedger {
    /// Create a ledger over a counter store.
    #[must_use]
    pub fn new(store: Arc<dyn CounterStore>, keys: Keys) -> Self {
        let quota = QuotaGovernor::new(Arc::clone(&store), keys.clone());
        Self { store, keys, quota }
    }

    /// The quota governor sharing this ledger's store and keys.
    #[must_use]
    pub fn quota(&self) -> &QuotaGovernor {
        &self.quota
    }

    /// Current balance; zero for accounts never credited.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable.
    pub async fn balance(&self, account: &AccountId) -> Result<i64> {
        let balance = self
            .store
            .get_int(&self.keys.balance(account))
            .await?
            .unwrap_or(0);
        tracing::debug!(account = %account, balance, "Read balance");
        Ok(balance)
    }

    /// Add credits to an account (purchase, trial, promotional grant).
    ///
    /// Not idempotent: callers that may repeat an award must deduplicate first.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` for non-positive amounts and a store error if
    /// the store is unavailable.
    pub async fn award(&self, account: &AccountId, amount: i64) -> Result<i64> {
        ensure_positive(amount)?;
        let new_balance = self
            .store
            .increment_by(&self.keys.balance(account), amount)
            .await?;
        tracing::info!(account = %account, amount, new_balance, "Credits awarded");
        Ok(new_balance)
    }

    /// Debit `amount` credits if the balance covers it and, when `daily_cap`
    /// is given, today's usage leaves room for it.
    ///
    /// Refusals are returned as an `ok: false` outcome, never as errors. On
    /// success today's usage grows by `amount`; refused attempts leave every
    /// counter untouched.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` for non-positive amounts and a store error if
    /// the store is unavailable. After a store error the debit may or may not
    /// have happened.
    pub async fn try_debit(
        &self,
        account: &AccountId,
        amount: i64,
        daily_cap: Option<i64>,
    ) -> Result<DebitOutcome> {
        ensure_positive(amount)?;

        if let Some(cap) = daily_cap {
            let remaining_today = self.quota.daily_remaining(account, cap).await?;
            if remaining_today < amount {
                let balance = self.balance(account).await?;
                tracing::warn!(
                    account = %account,
                    amount,
                    cap,
                    remaining_today,
                    "Debit refused: daily cap exceeded"
                );
                return Ok(DebitOutcome::daily_cap_exceeded(balance, remaining_today));
            }
        }

        let Some(remaining) = self
            .store
            .decrement_if_sufficient(&self.keys.balance(account), amount)
            .await?
        else {
            let balance = self.balance(account).await?;
            tracing::warn!(account = %account, amount, balance, "Debit refused: insufficient credits");
            return Ok(DebitOutcome::insufficient(balance));
        };

        let used = self.quota.record_usage(account, amount).await?;
        let daily_remaining = daily_cap.map(|cap| (cap - used).max(0));

        tracing::debug!(
            account = %account,
            amount,
            remaining,
            used_today = used,
            "Credits debited"
        );

        Ok(DebitOutcome::approved(remaining, daily_remaining))
    }

    /// Give back credits after the debited operation failed downstream.
    ///
    /// Today's usage is not reduced: the daily slot stays consumed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` for non-positive amounts and a store error if
    /// the store is unavailable.
    pub async fn refund(&self, account: &AccountId, amount: i64) -> Result<i64> {
        tracing::info!(account = %account, amount, "Refunding credits");
        self.award(account, amount).await
    }

    /// Refund at most once per `operation`.
    ///
    /// The operation is claimed with a set-if-absent marker kept for
    /// `retention`; a repeated call finds the marker and returns `None`. If the
    /// award fails the claim is released so the caller can retry.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` for non-positive amounts and a store error if
    /// the store is unavailable.
    pub async fn refund_once(
        &self,
        account: &AccountId,
        amount: i64,
        operation: &OperationId,
        retention: Duration,
    ) -> Result<Option<i64>> {
        ensure_positive(amount)?;

        let marker = self.keys.refund_operation(account, operation);
        if !self.store.set_if_absent(&marker, "1", Some(retention)).await? {
            tracing::warn!(account = %account, operation = %operation, "Duplicate refund");
            return Ok(None);
        }

        match self.refund(account, amount).await {
            Ok(balance) => Ok(Some(balance)),
            Err(err) => {
                if let Err(release) = self.store.delete(&marker).await {
                    tracing::error!(
                        account = %account,
                        operation = %operation,
                        error = %release,
                        "Failed to release refund claim"
                    );
                }
                Err(err)
            }
        }
    }
}
