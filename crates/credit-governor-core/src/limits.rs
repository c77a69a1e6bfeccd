//! Default quotas and retention windows.

use std::time::Duration;

/// Default cap on debited units per account per UTC day.
pub const DEFAULT_DAILY_CAP: i64 = 100;

/// Default ceiling on generations per content fingerprint (1 initial + 3 regenerations).
pub const DEFAULT_MAX_GENERATIONS_PER_CONTENT: i64 = 4;

/// Default one-time trial grant.
pub const DEFAULT_TRIAL_CREDITS: i64 = 1;

/// Daily usage counters outlive their day so the UTC boundary is covered.
pub const DAILY_USAGE_TTL: Duration = Duration::from_secs(48 * 60 * 60);

/// Default rolling window for regeneration counters.
pub const DEFAULT_REGEN_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// Retention of processed payment event markers.
pub const PROCESSED_EVENT_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Retention of dead-letter records awaiting manual reconciliation.
pub const DEAD_LETTER_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Default bound on a single counter store round trip.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_millis(2000);
