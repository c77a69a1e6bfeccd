//! Redis counter store.
//!
//! Uses a `ConnectionManager`, which multiplexes commands over one connection
//! and reconnects on failure. Every round trip is bounded by the configured
//! response timeout; a timed-out call surfaces as `StoreError::Timeout` and its
//! effect on the store is unknown.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisResult, Script};

use crate::error::{Result, StoreError};
use crate::CounterStore;

/// Check-and-decrement in one script so no other client can interleave
/// between the read and the write. Returns the new balance or -1.
const DEBIT_SCRIPT: &str = r"
local current = tonumber(redis.call('GET', KEYS[1]) or '0')
local amount = tonumber(ARGV[1])
if current >= amount then
  return redis.call('DECRBY', KEYS[1], amount)
end
return -1
";

/// Redis connection settings.
#[derive(Clone, Debug)]
pub struct RedisConfig {
    /// Bound on establishing the initial connection.
    pub connection_timeout: Duration,
    /// Bound on each command round trip.
    pub response_timeout: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            connection_timeout: Duration::from_secs(10),
            response_timeout: Duration::from_secs(2),
        }
    }
}

impl RedisConfig {
    /// Set the per-command response timeout.
    #[must_use]
    pub fn response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }
}

/// Redis-backed `CounterStore`.
pub struct RedisStore {
    conn: ConnectionManager,
    config: RedisConfig,
    debit_script: Script,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Connect with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the server is unreachable.
    pub async fn connect(redis_url: &str) -> Result<Self> {
        Self::connect_with(redis_url, RedisConfig::default()).await
    }

    /// Connect with explicit settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid, the server is unreachable, or
    /// the connection is not established within `connection_timeout`.
    pub async fn connect_with(redis_url: &str, config: RedisConfig) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| StoreError::Configuration(e.to_string()))?;

        let conn = tokio::time::timeout(config.connection_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| StoreError::Timeout {
                operation: "connect",
                after: config.connection_timeout,
            })?
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        tracing::info!(
            response_timeout_ms = config.response_timeout.as_millis(),
            "Connected to Redis counter store"
        );

        Ok(Self {
            conn,
            config,
            debit_script: Script::new(DEBIT_SCRIPT),
        })
    }

    /// Run one round trip under the response timeout.
    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = RedisResult<T>> + Send,
    ) -> Result<T> {
        match tokio::time::timeout(self.config.response_timeout, fut).await {
            Ok(result) => result.map_err(StoreError::from),
            Err(_) => {
                tracing::warn!(
                    operation,
                    after_ms = self.config.response_timeout.as_millis(),
                    "Redis command timed out"
                );
                Err(StoreError::Timeout {
                    operation,
                    after: self.config.response_timeout,
                })
            }
        }
    }
}

fn ttl_secs(ttl: Duration) -> u64 {
    // Redis rejects EX 0; round sub-second TTLs up.
    ttl.as_secs().max(1)
}

#[async_trait]
impl CounterStore for RedisStore {
    fn name(&self) -> &str {
        "redis"
    }

    async fn get_int(&self, key: &str) -> Result<Option<i64>> {
        let mut conn = self.conn.clone();
        self.bounded("get", async move { conn.get(key).await }).await
    }

    async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        self.bounded("get", async move { conn.get(key).await }).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl {
            cmd.arg("EX").arg(ttl_secs(ttl));
        }
        self.bounded("set", async move { cmd.query_async::<()>(&mut conn).await })
            .await
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<bool> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value).arg("NX");
        if let Some(ttl) = ttl {
            cmd.arg("EX").arg(ttl_secs(ttl));
        }
        let reply: Option<String> = self
            .bounded("set_nx", async move { cmd.query_async(&mut conn).await })
            .await?;
        Ok(reply.is_some())
    }

    async fn increment_by(&self, key: &str, delta: i64) -> Result<i64> {
        let mut conn = self.conn.clone();
        self.bounded("incrby", async move { conn.incr(key, delta).await })
            .await
    }

    async fn decrement_by(&self, key: &str, delta: i64) -> Result<i64> {
        let mut conn = self.conn.clone();
        self.bounded("decrby", async move { conn.decr(key, delta).await })
            .await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.conn.clone();
        let secs = i64::try_from(ttl_secs(ttl)).unwrap_or(i64::MAX);
        self.bounded("expire", async move { conn.expire(key, secs).await })
            .await
    }

    async fn decrement_if_sufficient(&self, key: &str, amount: i64) -> Result<Option<i64>> {
        let mut conn = self.conn.clone();
        let mut invocation = self.debit_script.key(key);
        invocation.arg(amount);
        let result: i64 = self
            .bounded("debit_script", async move {
                invocation.invoke_async(&mut conn).await
            })
            .await?;
        Ok((result >= 0).then_some(result))
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let removed: i64 = self
            .bounded("del", async move { conn.del(key).await })
            .await?;
        Ok(removed > 0)
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        let mut conn = self.conn.clone();
        let secs: i64 = self
            .bounded("ttl", async move { conn.ttl(key).await })
            .await?;
        // -2: absent, -1: no expiry
        Ok(u64::try_from(secs).ok().map(Duration::from_secs))
    }
}
