//! Router configuration.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{admin, credits, gate, health, webhooks};
use crate::state::AppState;

/// Maximum concurrent requests for the metered gate.
const GATE_MAX_CONCURRENT_REQUESTS: usize = 100;

/// Maximum concurrent requests for other API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Service API key
/// - `GET /v1/credits/:account` - Balance and daily allowance (grants the trial)
/// - `POST /v1/gate/authorize` - Debit units for one metered operation
/// - `POST /v1/gate/refund` - Give back units after a failed operation
/// - `GET /v1/admin/dead-letters/:event_id` - Inspect a failed award
/// - `POST /v1/admin/dead-letters/:event_id/resolve` - Award and clear it
///
/// ## Webhooks (signature verification)
/// - `POST /webhooks/stripe` - Stripe payment events
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.cors_origins);
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let state = Arc::new(state);

    Router::new()
        .route("/health", get(health::health))
        .nest(
            "/v1",
            api_routes(GATE_MAX_CONCURRENT_REQUESTS, API_MAX_CONCURRENT_REQUESTS),
        )
        // Webhooks are not rate limited; Stripe controls the delivery rate.
        .route("/webhooks/stripe", post(webhooks::stripe_webhook))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// `/v1` routes. The gate has its own limit and also counts against the
/// API-wide one.
fn api_routes(gate_limit: usize, api_limit: usize) -> Router<Arc<AppState>> {
    let gate_routes = Router::new()
        .route("/authorize", post(gate::authorize))
        .route("/refund", post(gate::refund))
        .layer(ConcurrencyLimitLayer::new(gate_limit));

    Router::new()
        .route("/credits/:account", get(credits::get_credits))
        .route("/admin/dead-letters/:event_id", get(admin::get_dead_letter))
        .route(
            "/admin/dead-letters/:event_id/resolve",
            post(admin::resolve_dead_letter),
        )
        .nest("/gate", gate_routes)
        .layer(ConcurrencyLimitLayer::new(api_limit))
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use credit_governor_store::MemoryStore;

    use super::*;
    use crate::config::ServiceConfig;

    fn server(gate_limit: usize, api_limit: usize) -> TestServer {
        let state = AppState::new(Arc::new(MemoryStore::new()), ServiceConfig::default()).unwrap();
        let router = Router::new()
            .nest("/v1", api_routes(gate_limit, api_limit))
            .with_state(Arc::new(state));
        TestServer::new(router).unwrap()
    }

    #[tokio::test]
    async fn gate_routes_count_against_the_api_limit() {
        // No API permits: a gate request waits even though the gate has room.
        let server = server(1, 0);
        let waited = tokio::time::timeout(
            Duration::from_millis(200),
            server.post("/v1/gate/refund"),
        )
        .await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn gate_routes_are_served_with_permits() {
        let server = server(1, 1);
        server
            .post("/v1/gate/refund")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }
}
