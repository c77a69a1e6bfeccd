//! One-time trial grants.

use std::sync::Arc;

use credit_governor_core::{AccountId, TrialGrant};
use credit_governor_store::{CounterStore, Keys};

use crate::error::Result;
use crate::ledger::CreditLedger;

/// Grants each account its trial credits at most once, ever.
///
/// The marker is claimed with set-if-absent *before* the award. A crash
/// between the two loses the grant; it can never duplicate it.
#[derive(Clone)]
pub struct TrialGrantor {
    store: Arc<dyn CounterStore>,
    keys: Keys,
    ledger: CreditLedger,
}

impl TrialGrantor {
    /// Create a trial grantor awarding through `ledger`.
    #[must_use]
    pub fn new(store: Arc<dyn CounterStore>, keys: Keys, ledger: CreditLedger) -> Self {
        Self {
            store,
            keys,
            ledger,
        }
    }

    /// Award `trial_amount` the first time an account is seen.
    ///
    /// Safe to call on every entry point that gates on credits; repeat calls
    /// only read the balance.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable.
    pub async fn ensure_trial(&self, account: &AccountId, trial_amount: i64) -> Result<TrialGrant> {
        let claimed = self
            .store
            .set_if_absent(&self.keys.trial_marker(account), "1", None)
            .await?;

        if !claimed {
            let balance = self.ledger.balance(account).await?;
            return Ok(TrialGrant {
                granted: false,
                balance,
            });
        }

        // A zero trial still claims the marker so the account is not re-evaluated.
        let balance = if trial_amount > 0 {
            self.ledger.award(account, trial_amount).await?
        } else {
            self.ledger.balance(account).await?
        };

        tracing::info!(account = %account, trial_amount, balance, "Trial credits granted");

        Ok(TrialGrant {
            granted: true,
            balance,
        })
    }
}
