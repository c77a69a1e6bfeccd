//! Application state.

use std::sync::Arc;

use credit_governor_engine::{Governor, GovernorError};
use credit_governor_store::CounterStore;

use crate::config::ServiceConfig;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Ledger, quotas, trial grants, payment processing and gate.
    pub governor: Governor,

    /// Service configuration.
    pub config: ServiceConfig,
}

impl AppState {
    /// Create the application state over a counter store.
    ///
    /// # Errors
    ///
    /// Returns an error if the governor configuration is invalid.
    pub fn new(store: Arc<dyn CounterStore>, config: ServiceConfig) -> Result<Self, GovernorError> {
        let governor = Governor::new(store, config.governor.clone())?;

        if config.stripe_webhook_secret.is_none() {
            tracing::warn!("STRIPE_WEBHOOK_SECRET not set - Stripe webhooks will be refused");
        }
        if config.service_api_key.is_none() {
            tracing::warn!("SERVICE_API_KEY not set - authenticated endpoints will be refused");
        }

        Ok(Self { governor, config })
    }
}
