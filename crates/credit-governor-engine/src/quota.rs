//! Daily usage and per-content regeneration quotas.
//!
//! Both counters are plain integers in the counter store with a TTL, so they
//! clean themselves up. Neither is consulted atomically with the debit: the
//! daily cap is a soft limit that may overshoot by the number of requests in
//! flight at the boundary.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};

use credit_governor_core::limits::DAILY_USAGE_TTL;
use credit_governor_core::{AccountId, ContentFingerprint};
use credit_governor_store::{CounterStore, Keys};

use crate::error::Result;

/// Current UTC calendar day.
pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Reads and advances the daily usage and regeneration counters.
#[derive(Clone)]
pub struct QuotaGovernor {
    store: Arc<dyn CounterStore>,
    keys: Keys,
}

impl QuotaGovernor {
    /// Create a quota governor over a counter store.
    #[must_use]
    pub fn new(store: Arc<dyn CounterStore>, keys: Keys) -> Self {
        Self { store, keys }
    }

    /// Units debited from `account` today (UTC).
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable.
    pub async fn daily_usage(&self, account: &AccountId) -> Result<i64> {
        let key = self.keys.daily_usage(account, today());
        Ok(self.store.get_int(&key).await?.unwrap_or(0))
    }

    /// Units `account` may still debit today under `cap`, floored at zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable.
    pub async fn daily_remaining(&self, account: &AccountId, cap: i64) -> Result<i64> {
        let used = self.daily_usage(account).await?;
        Ok((cap - used).max(0))
    }

    /// Add a successful debit to today's usage and return the new total.
    ///
    /// The expiry is re-set on every call; it only has to outlive the day.
    pub(crate) async fn record_usage(&self, account: &AccountId, amount: i64) -> Result<i64> {
        let key = self.keys.daily_usage(account, today());
        let used = self.store.increment_by(&key, amount).await?;
        self.store.expire(&key, DAILY_USAGE_TTL).await?;
        Ok(used)
    }

    /// Generations recorded for this content within the current window.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable.
    pub async fn regen_count(
        &self,
        account: &AccountId,
        fingerprint: &ContentFingerprint,
    ) -> Result<i64> {
        let key = self.keys.regen(account, fingerprint);
        Ok(self.store.get_int(&key).await?.unwrap_or(0))
    }

    /// Record one generation for this content and return the new count.
    ///
    /// The window starts at the first generation: the TTL is applied only
    /// when the count goes from 0 to 1, so later generations do not extend it.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable.
    pub async fn increment_regen(
        &self,
        account: &AccountId,
        fingerprint: &ContentFingerprint,
        ttl: Duration,
    ) -> Result<i64> {
        let key = self.keys.regen(account, fingerprint);
        let count = self.store.increment_by(&key, 1).await?;
        if count == 1 {
            self.store.expire(&key, ttl).await?;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use credit_governor_store::MemoryStore;

    use super::*;

    fn governor() -> (QuotaGovernor, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (QuotaGovernor::new(store.clone(), Keys::new()), store)
    }

    #[tokio::test]
    async fn daily_usage_defaults_to_zero() {
        let (quota, _) = governor();
        let account = AccountId::generate();
        assert_eq!(quota.daily_usage(&account).await.unwrap(), 0);
        assert_eq!(quota.daily_remaining(&account, 10).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn daily_remaining_is_floored_at_zero() {
        let (quota, _) = governor();
        let account = AccountId::generate();

        quota.record_usage(&account, 3).await.unwrap();
        assert_eq!(quota.daily_remaining(&account, 10).await.unwrap(), 7);

        quota.record_usage(&account, 9).await.unwrap();
        assert_eq!(quota.daily_usage(&account).await.unwrap(), 12);
        assert_eq!(quota.daily_remaining(&account, 10).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn record_usage_sets_retention() {
        let (quota, store) = governor();
        let account = AccountId::generate();
        quota.record_usage(&account, 1).await.unwrap();

        let key = Keys::new().daily_usage(&account, today());
        let ttl = store.ttl(&key).await.unwrap().unwrap();
        assert!(ttl <= DAILY_USAGE_TTL);
        assert!(ttl > DAILY_USAGE_TTL - Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn regen_window_starts_at_first_generation() {
        let (quota, store) = governor();
        let account = AccountId::generate();
        let fp = ContentFingerprint::of("a lighthouse in fog");
        let window = Duration::from_secs(100);

        assert_eq!(quota.regen_count(&account, &fp).await.unwrap(), 0);
        assert_eq!(quota.increment_regen(&account, &fp, window).await.unwrap(), 1);

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(quota.increment_regen(&account, &fp, window).await.unwrap(), 2);

        let key = Keys::new().regen(&account, &fp);
        assert_eq!(store.ttl(&key).await.unwrap(), Some(Duration::from_secs(40)));

        tokio::time::advance(Duration::from_secs(41)).await;
        assert_eq!(quota.regen_count(&account, &fp).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn regen_counters_are_scoped_by_content() {
        let (quota, _) = governor();
        let account = AccountId::generate();
        let a = ContentFingerprint::of("prompt a");
        let b = ContentFingerprint::of("prompt b");
        let window = Duration::from_secs(60);

        quota.increment_regen(&account, &a, window).await.unwrap();
        quota.increment_regen(&account, &a, window).await.unwrap();

        assert_eq!(quota.regen_count(&account, &a).await.unwrap(), 2);
        assert_eq!(quota.regen_count(&account, &b).await.unwrap(), 0);
    }
}
