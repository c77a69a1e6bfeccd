//! Common test utilities for service integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use axum_test::{TestRequest, TestServer};

use credit_governor_core::AccountId;
use credit_governor_engine::GovernorConfig;
use credit_governor_service::stripe::sign_payload;
use credit_governor_service::{create_router, AppState, ServiceConfig};
use credit_governor_store::{Keys, MemoryStore};

pub const SERVICE_API_KEY: &str = "test-service-key";
pub const WEBHOOK_SECRET: &str = "whsec_test_secret";

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// The store behind the server, for inspection.
    pub store: Arc<MemoryStore>,
    /// Key builder matching the server's configuration.
    pub keys: Keys,
    /// A fresh account for the test.
    pub account: AccountId,
}

impl TestHarness {
    /// Create a harness with default quotas.
    pub fn new() -> Self {
        Self::with_governor(GovernorConfig::default())
    }

    /// Create a harness with custom quotas.
    pub fn with_governor(governor: GovernorConfig) -> Self {
        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            service_api_key: Some(SERVICE_API_KEY.into()),
            stripe_webhook_secret: Some(WEBHOOK_SECRET.into()),
            governor,
            ..ServiceConfig::default()
        };
        Self::with_config(config)
    }

    /// Create a harness from a full service configuration.
    pub fn with_config(config: ServiceConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let keys = Keys::with_prefix(config.governor.key_prefix.clone())
            .expect("Invalid key prefix");

        let state = AppState::new(store.clone(), config).expect("Failed to build state");
        let router: Router = create_router(state);
        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            store,
            keys,
            account: AccountId::generate(),
        }
    }

    /// `X-API-Key` header for service requests.
    pub fn api_key() -> (HeaderName, HeaderValue) {
        (
            HeaderName::from_static("x-api-key"),
            HeaderValue::from_static(SERVICE_API_KEY),
        )
    }

    /// GET with the service API key.
    pub fn authed_get(&self, path: &str) -> TestRequest {
        let (name, value) = Self::api_key();
        self.server.get(path).add_header(name, value)
    }

    /// POST with the service API key.
    pub fn authed_post(&self, path: &str) -> TestRequest {
        let (name, value) = Self::api_key();
        self.server.post(path).add_header(name, value)
    }

    /// Deliver a correctly signed Stripe webhook.
    pub fn stripe_webhook(&self, body: &str) -> TestRequest {
        let header = sign_payload(body, WEBHOOK_SECRET, chrono::Utc::now().timestamp())
            .expect("Failed to sign payload");
        self.server
            .post("/webhooks/stripe")
            .add_header(
                HeaderName::from_static("stripe-signature"),
                HeaderValue::from_str(&header).expect("Invalid header value"),
            )
            .text(body)
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// A `checkout.session.completed` event body.
pub fn checkout_event(event_id: &str, account: &AccountId, credits: &str) -> String {
    serde_json::json!({
        "id": event_id,
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": "cs_test_123",
                "client_reference_id": account.as_str(),
                "metadata": { "credits": credits }
            }
        }
    })
    .to_string()
}
