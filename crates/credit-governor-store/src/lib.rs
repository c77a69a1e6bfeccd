//! Counter store layer for the credit governor.
//!
//! The governor keeps all shared state as integer counters and small string
//! records in a remote key-value store. This crate defines the operations the
//! governor needs from that store and provides two implementations:
//!
//! - `RedisStore` (feature `redis-backend`): the production adapter. The
//!   check-and-decrement primitive runs as a single Lua script.
//! - `MemoryStore`: an in-process store with the same atomicity and TTL
//!   semantics, used for tests and local development.
//!
//! # Example
//!
//! ```no_run
//! use credit_governor_store::{CounterStore, Keys, MemoryStore};
//! use credit_governor_core::AccountId;
//!
//! # async fn demo() -> credit_governor_store::Result<()> {
//! let store = MemoryStore::new();
//! let keys = Keys::new();
//! let account = AccountId::generate();
//!
//! store.increment_by(&keys.balance(&account), 5).await?;
//! let after = store.decrement_if_sufficient(&keys.balance(&account), 2).await?;
//! assert_eq!(after, Some(3));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod memory;
#[cfg(feature = "redis-backend")]
pub mod redis_store;

pub use error::{Result, StoreError};
pub use keys::Keys;
pub use memory::MemoryStore;
#[cfg(feature = "redis-backend")]
pub use redis_store::{RedisConfig, RedisStore};

use std::time::Duration;

use async_trait::async_trait;

/// Operations the governor needs from the shared counter store.
///
/// Each method is a single network round trip and each is atomic from the
/// store's point of view. No method holds any in-process lock across an
/// await point, so any number of service instances may call concurrently.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Backend name, for logs.
    fn name(&self) -> &str;

    /// Read an integer counter. Absent keys read as `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable or the value is not an integer.
    async fn get_int(&self, key: &str) -> Result<Option<i64>>;

    /// Read a raw string value.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable.
    async fn get_raw(&self, key: &str) -> Result<Option<String>>;

    /// Unconditionally write a value, replacing any previous value and TTL.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;

    /// Write a value only if the key is absent. Returns `true` if this call
    /// created the key.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<bool>;

    /// Add `delta` to a counter, creating it at zero if absent. Keeps any TTL.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable or the value is not an integer.
    async fn increment_by(&self, key: &str, delta: i64) -> Result<i64>;

    /// Subtract `delta` from a counter, creating it at zero if absent. Keeps any TTL.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable or the value is not an integer.
    async fn decrement_by(&self, key: &str, delta: i64) -> Result<i64>;

    /// Set a key's time to live. Returns `false` if the key does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool>;

    /// Atomically decrement a counter by `amount` if its value (absent = 0) is
    /// at least `amount`. Returns the new value, or `None` when the value was
    /// too low and nothing changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable or the value is not an integer.
    async fn decrement_if_sufficient(&self, key: &str, amount: i64) -> Result<Option<i64>>;

    /// Delete a key. Returns `true` if it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Remaining time to live of a key, `None` if absent or persistent.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable.
    async fn ttl(&self, key: &str) -> Result<Option<Duration>>;
}
