//! Service configuration.

use std::time::Duration;

use credit_governor_engine::GovernorConfig;

use crate::stripe::DEFAULT_SIGNATURE_TOLERANCE;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Redis connection URL (default: "redis://127.0.0.1:6379").
    pub redis_url: String,

    /// Service API key for service-to-service and admin requests.
    pub service_api_key: Option<String>,

    /// Stripe webhook signing secret. Webhooks are refused while unset.
    pub stripe_webhook_secret: Option<String>,

    /// Maximum age of a signed webhook; `None` disables the check.
    pub stripe_signature_tolerance: Option<Duration>,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Quotas and retention windows.
    pub governor: GovernorConfig,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            redis_url: std::env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            service_api_key: std::env::var("SERVICE_API_KEY").ok(),
            stripe_webhook_secret: std::env::var("STRIPE_WEBHOOK_SECRET").ok(),
            stripe_signature_tolerance: match std::env::var("STRIPE_SIGNATURE_TOLERANCE_SECONDS")
                .ok()
                .and_then(|s| s.trim().parse::<u64>().ok())
            {
                Some(0) => None,
                Some(secs) => Some(Duration::from_secs(secs)),
                None => defaults.stripe_signature_tolerance,
            },
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: std::env::var("MAX_BODY_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_body_bytes),
            request_timeout_seconds: std::env::var("REQUEST_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.request_timeout_seconds),
            governor: GovernorConfig::from_env(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            redis_url: "redis://127.0.0.1:6379".into(),
            service_api_key: None,
            stripe_webhook_secret: None,
            stripe_signature_tolerance: Some(DEFAULT_SIGNATURE_TOLERANCE),
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024, // 1MB
            request_timeout_seconds: 30,
            governor: GovernorConfig::default(),
        }
    }
}
