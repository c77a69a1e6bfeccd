//! Credit governor engine.
//!
//! Everything here is stateless: all shared state lives in the counter store,
//! so any number of service instances may run the same operations concurrently.
//!
//! - **Ledger**: `CreditLedger` reads, awards, debits and refunds balances
//! - **Quotas**: `QuotaGovernor` tracks daily usage and per-content regenerations
//! - **Trials**: `TrialGrantor` grants each account its trial credits once
//! - **Payments**: `PaymentEventProcessor` turns redelivered payment events into
//!   exactly-once awards, dead-lettering failed awards
//! - **Gate**: `MeteredGate` runs the full pre-operation check in one call
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use credit_governor_engine::{GateDecision, Governor, GovernorConfig};
//! use credit_governor_store::MemoryStore;
//! use credit_governor_core::AccountId;
//!
//! # async fn demo() -> credit_governor_engine::Result<()> {
//! let governor = Governor::new(Arc::new(MemoryStore::new()), GovernorConfig::default())?;
//! let account = AccountId::generate();
//!
//! match governor.gate().authorize(&account, "a prompt", 1).await? {
//!     GateDecision::Granted(permit) => permit.commit(),
//!     GateDecision::Denied(denial) => println!("denied: {denial:?}"),
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod gate;
pub mod ledger;
pub mod payments;
pub mod quota;
pub mod trial;

pub use config::GovernorConfig;
pub use error::{GovernorError, Result};
pub use gate::{CreditStatus, GateDecision, MeteredGate, MeteredPermit};
pub use ledger::CreditLedger;
pub use payments::{IgnoreReason, PaymentEventProcessor, ProcessOutcome};
pub use quota::QuotaGovernor;
pub use trial::TrialGrantor;

use std::sync::Arc;

use credit_governor_store::{CounterStore, Keys};

/// All governor components wired over one store and one configuration.
#[derive(Clone)]
pub struct Governor {
    ledger: CreditLedger,
    trial: TrialGrantor,
    payments: PaymentEventProcessor,
    gate: MeteredGate,
    config: GovernorConfig,
    store_name: String,
}

impl Governor {
    /// Build the components.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the key prefix is invalid.
    pub fn new(store: Arc<dyn CounterStore>, config: GovernorConfig) -> Result<Self> {
        let keys = Keys::with_prefix(config.key_prefix.clone())
            .map_err(|e| GovernorError::Configuration(e.to_string()))?;

        let ledger = CreditLedger::new(Arc::clone(&store), keys.clone());
        let trial = TrialGrantor::new(Arc::clone(&store), keys.clone(), ledger.clone());
        let payments = PaymentEventProcessor::new(
            Arc::clone(&store),
            keys,
            ledger.clone(),
            config.processed_event_ttl,
            config.dead_letter_ttl,
        );
        let gate = MeteredGate::new(ledger.clone(), trial.clone(), config.clone());

        tracing::info!(
            store = store.name(),
            daily_cap = ?config.daily_cap,
            max_generations_per_content = config.max_generations_per_content,
            trial_credits = config.trial_credits,
            "Credit governor initialized"
        );

        Ok(Self {
            ledger,
            trial,
            payments,
            gate,
            config,
            store_name: store.name().to_string(),
        })
    }

    /// Credit ledger.
    #[must_use]
    pub fn ledger(&self) -> &CreditLedger {
        &self.ledger
    }

    /// Daily and regeneration quotas.
    #[must_use]
    pub fn quota(&self) -> &QuotaGovernor {
        self.ledger.quota()
    }

    /// Trial grantor.
    #[must_use]
    pub fn trial(&self) -> &TrialGrantor {
        &self.trial
    }

    /// Payment event processor.
    #[must_use]
    pub fn payments(&self) -> &PaymentEventProcessor {
        &self.payments
    }

    /// Metered gate.
    #[must_use]
    pub fn gate(&self) -> &MeteredGate {
        &self.gate
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &GovernorConfig {
        &self.config
    }

    /// Name of the counter store backend.
    #[must_use]
    pub fn store_name(&self) -> &str {
        &self.store_name
    }
}

#[cfg(test)]
mod tests {
    use credit_governor_core::PaymentEvent;
    use credit_governor_store::MemoryStore;

    use super::*;

    #[test]
    fn invalid_prefix_is_rejected() {
        let config = GovernorConfig {
            key_prefix: "bad prefix!".into(),
            ..GovernorConfig::default()
        };
        let result = Governor::new(Arc::new(MemoryStore::new()), config);
        assert!(matches!(result, Err(GovernorError::Configuration(_))));
    }

    #[tokio::test]
    async fn components_share_the_store() {
        let store = Arc::new(MemoryStore::new());
        let config = GovernorConfig {
            key_prefix: "app:".into(),
            ..GovernorConfig::default()
        };
        let governor = Governor::new(store.clone(), config).unwrap();
        let account = credit_governor_core::AccountId::generate();

        let event = PaymentEvent::checkout_completed("evt_1".parse().unwrap(), account.clone(), 60);
        governor.payments().process(&event).await.unwrap();

        let status = governor.gate().status(&account).await.unwrap();
        assert_eq!(status.balance, 61);
        assert_eq!(governor.store_name(), "memory");
        assert_eq!(
            store
                .get_int(&format!("app:credits:{account}"))
                .await
                .unwrap(),
            Some(61)
        );
    }
}
