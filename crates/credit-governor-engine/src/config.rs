//! Governor configuration.

use std::time::Duration;

use credit_governor_core::limits;

/// Quotas and retention windows, loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GovernorConfig {
    /// Units an account may debit per UTC day; `None` disables the cap.
    pub daily_cap: Option<i64>,

    /// Generations allowed per content fingerprint within `regen_window`.
    pub max_generations_per_content: i64,

    /// One-time trial grant for new accounts.
    pub trial_credits: i64,

    /// Rolling window of the regeneration counter.
    pub regen_window: Duration,

    /// How long processed payment event markers are kept.
    pub processed_event_ttl: Duration,

    /// How long dead-letter records are kept.
    pub dead_letter_ttl: Duration,

    /// Bound on each store round trip made by the metered gate.
    pub store_timeout: Duration,

    /// Namespace prefix for all store keys.
    pub key_prefix: String,
}

impl GovernorConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables fall back to their defaults.
    /// `DAILY_CAP=0` disables the daily cap.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            daily_cap: match env_parse::<i64>("DAILY_CAP") {
                Some(cap) if cap > 0 => Some(cap),
                Some(_) => None,
                None => defaults.daily_cap,
            },
            max_generations_per_content: env_parse("MAX_GENERATIONS_PER_CONTENT")
                .filter(|n: &i64| *n > 0)
                .unwrap_or(defaults.max_generations_per_content),
            trial_credits: env_parse("TRIAL_CREDITS")
                .filter(|n: &i64| *n >= 0)
                .unwrap_or(defaults.trial_credits),
            regen_window: env_parse("REGEN_WINDOW_SECONDS")
                .map_or(defaults.regen_window, Duration::from_secs),
            processed_event_ttl: env_parse("PROCESSED_EVENT_TTL_SECONDS")
                .map_or(defaults.processed_event_ttl, Duration::from_secs),
            dead_letter_ttl: env_parse("DEAD_LETTER_TTL_SECONDS")
                .map_or(defaults.dead_letter_ttl, Duration::from_secs),
            store_timeout: env_parse("STORE_TIMEOUT_MS")
                .map_or(defaults.store_timeout, Duration::from_millis),
            key_prefix: std::env::var("KEY_PREFIX").unwrap_or(defaults.key_prefix),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            daily_cap: Some(limits::DEFAULT_DAILY_CAP),
            max_generations_per_content: limits::DEFAULT_MAX_GENERATIONS_PER_CONTENT,
            trial_credits: limits::DEFAULT_TRIAL_CREDITS,
            regen_window: limits::DEFAULT_REGEN_WINDOW,
            processed_event_ttl: limits::PROCESSED_EVENT_TTL,
            dead_letter_ttl: limits::DEAD_LETTER_TTL,
            store_timeout: limits::DEFAULT_STORE_TIMEOUT,
            key_prefix: String::new(),
        }
    }
}
