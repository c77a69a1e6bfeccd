//! In-process counter store.
//!
//! `MemoryStore` mirrors the Redis semantics the governor relies on: absent
//! integers read as zero for arithmetic, increments keep an existing TTL,
//! `set` replaces it, expired keys behave as absent. Every mutation runs under
//! the map's per-key entry lock, which gives the same single-key atomicity the
//! Redis Lua script provides.
//!
//! Expiry is measured with `tokio::time::Instant`, so tests can drive it with
//! `tokio::time::pause` and `tokio::time::advance`.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::time::Instant;

use crate::error::{Result, StoreError};
use crate::CounterStore;

#[derive(Debug, Clone)]
struct Slot {
    value: String,
    expires_at: Option<Instant>,
}

impl Slot {
    fn persistent(value: String) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    fn as_int(&self) -> Result<i64> {
        self.value
            .parse()
            .map_err(|_| StoreError::Command("value is not an integer or out of range".into()))
    }
}

/// In-memory `CounterStore` implementation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, Slot>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .iter()
            .filter(|entry| !entry.value().is_expired(now))
            .count()
    }

    /// Whether the store holds no live keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `f` against the live slot for `key` while holding its entry lock.
    ///
    /// `f` sees `None` for absent or expired keys. Whatever `f` leaves in the
    /// option is written back; `None` removes the key.
    fn with_slot<R>(&self, key: &str, f: impl FnOnce(&mut Option<Slot>) -> R) -> R {
        let now = Instant::now();
        match self.entries.entry(key.to_owned()) {
            Entry::Occupied(mut occupied) => {
                let mut slot = if occupied.get().is_expired(now) {
                    None
                } else {
                    Some(occupied.get().clone())
                };
                let out = f(&mut slot);
                match slot {
                    Some(slot) => {
                        occupied.insert(slot);
                    }
                    None => {
                        occupied.remove();
                    }
                }
                out
            }
            Entry::Vacant(vacant) => {
                let mut slot = None;
                let out = f(&mut slot);
                if let Some(slot) = slot {
                    vacant.insert(slot);
                }
                out
            }
        }
    }

    fn add(&self, key: &str, delta: i64) -> Result<i64> {
        self.with_slot(key, |slot| {
            let current = slot.as_ref().map(Slot::as_int).transpose()?.unwrap_or(0);
            let next = current
                .checked_add(delta)
                .ok_or_else(|| StoreError::Command("increment or decrement would overflow".into()))?;
            match slot {
                Some(existing) => existing.value = next.to_string(),
                None => *slot = Some(Slot::persistent(next.to_string())),
            }
            Ok(next)
        })
    }
}

#[async_trait]
impl CounterStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get_int(&self, key: &str) -> Result<Option<i64>> {
        self.with_slot(key, |slot| slot.as_ref().map(Slot::as_int).transpose())
    }

    async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        Ok(self.with_slot(key, |slot| slot.as_ref().map(|s| s.value.clone())))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.with_slot(key, |slot| {
            *slot = Some(Slot {
                value: value.to_owned(),
                expires_at,
            });
        });
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<bool> {
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        Ok(self.with_slot(key, |slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(Slot {
                value: value.to_owned(),
                expires_at,
            });
            true
        }))
    }

    async fn increment_by(&self, key: &str, delta: i64) -> Result<i64> {
        self.add(key, delta)
    }

    async fn decrement_by(&self, key: &str, delta: i64) -> Result<i64> {
        let delta = delta
            .checked_neg()
            .ok_or_else(|| StoreError::Command("decrement would overflow".into()))?;
        self.add(key, delta)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let expires_at = Instant::now() + ttl;
        Ok(self.with_slot(key, |slot| match slot {
            Some(existing) => {
                existing.expires_at = Some(expires_at);
                true
            }
            None => false,
        }))
    }

    async fn decrement_if_sufficient(&self, key: &str, amount: i64) -> Result<Option<i64>> {
        self.with_slot(key, |slot| {
            let current = slot.as_ref().map(Slot::as_int).transpose()?.unwrap_or(0);
            if current < amount {
                return Ok(None);
            }
            let next = current - amount;
            match slot {
                Some(existing) => existing.value = next.to_string(),
                None => *slot = Some(Slot::persistent(next.to_string())),
            }
            Ok(Some(next))
        })
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.with_slot(key, |slot| slot.take().is_some()))
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        let now = Instant::now();
        Ok(self.with_slot(key, |slot| {
            slot.as_ref()
                .and_then(|s| s.expires_at)
                .map(|at| at.saturating_duration_since(now))
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn absent_keys_read_as_none() {
        let store = MemoryStore::new();
        assert_eq!(store.get_int("credits:nobody").await.unwrap(), None);
        assert_eq!(store.get_raw("credits:nobody").await.unwrap(), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn increment_and_decrement_create_keys() {
        let store = MemoryStore::new();
        assert_eq!(store.increment_by("a", 5).await.unwrap(), 5);
        assert_eq!(store.increment_by("a", 2).await.unwrap(), 7);
        assert_eq!(store.decrement_by("a", 3).await.unwrap(), 4);
        assert_eq!(store.decrement_by("b", 1).await.unwrap(), -1);
        assert_eq!(store.get_int("a").await.unwrap(), Some(4));
    }

    #[tokio::test]
    async fn increment_rejects_non_integer_values() {
        let store = MemoryStore::new();
        store.set("record", "{\"x\":1}", None).await.unwrap();
        assert!(matches!(
            store.increment_by("record", 1).await,
            Err(StoreError::Command(_))
        ));
        assert!(store.get_int("record").await.is_err());
    }

    #[tokio::test]
    async fn set_if_absent_only_once() {
        let store = MemoryStore::new();
        assert!(store.set_if_absent("trial:granted:u1", "1", None).await.unwrap());
        assert!(!store.set_if_absent("trial:granted:u1", "1", None).await.unwrap());
        assert_eq!(
            store.get_raw("trial:granted:u1").await.unwrap().as_deref(),
            Some("1")
        );
    }

    #[tokio::test]
    async fn decrement_if_sufficient_guards_balance() {
        let store = MemoryStore::new();
        assert_eq!(store.decrement_if_sufficient("bal", 1).await.unwrap(), None);
        assert_eq!(store.get_int("bal").await.unwrap(), None);

        store.increment_by("bal", 3).await.unwrap();
        assert_eq!(store.decrement_if_sufficient("bal", 2).await.unwrap(), Some(1));
        assert_eq!(store.decrement_if_sufficient("bal", 2).await.unwrap(), None);
        assert_eq!(store.decrement_if_sufficient("bal", 1).await.unwrap(), Some(0));
        assert_eq!(store.get_int("bal").await.unwrap(), Some(0));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_conditional_decrements_never_overspend() {
        let store = Arc::new(MemoryStore::new());
        store.increment_by("bal", 10).await.unwrap();

        let tasks: Vec<_> = (0..50)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.decrement_if_sufficient("bal", 1).await })
            })
            .collect();

        let results = futures::future::join_all(tasks).await;
        let succeeded = results
            .into_iter()
            .filter(|r| matches!(r, Ok(Ok(Some(_)))))
            .count();

        assert_eq!(succeeded, 10);
        assert_eq!(store.get_int("bal").await.unwrap(), Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn keys_expire_after_ttl() {
        let store = MemoryStore::new();
        store
            .set_if_absent("seen", "1", Some(Duration::from_secs(60)))
            .await
            .unwrap();
        assert_eq!(
            store.ttl("seen").await.unwrap(),
            Some(Duration::from_secs(60))
        );

        tokio::time::advance(Duration::from_secs(61)).await;

        assert_eq!(store.get_raw("seen").await.unwrap(), None);
        assert!(store.set_if_absent("seen", "1", None).await.unwrap());
        assert_eq!(store.ttl("seen").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn increments_keep_ttl_and_set_replaces_it() {
        let store = MemoryStore::new();
        store.increment_by("daily", 1).await.unwrap();
        assert!(store.expire("daily", Duration::from_secs(100)).await.unwrap());

        tokio::time::advance(Duration::from_secs(40)).await;
        store.increment_by("daily", 1).await.unwrap();
        assert_eq!(
            store.ttl("daily").await.unwrap(),
            Some(Duration::from_secs(60))
        );

        store.set("daily", "9", None).await.unwrap();
        assert_eq!(store.ttl("daily").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expire_and_delete_report_existence() {
        let store = MemoryStore::new();
        assert!(!store.expire("missing", Duration::from_secs(1)).await.unwrap());
        assert!(!store.delete("missing").await.unwrap());

        store.set("k", "v", None).await.unwrap();
        assert!(store.delete("k").await.unwrap());
        assert_eq!(store.get_raw("k").await.unwrap(), None);
    }
}
