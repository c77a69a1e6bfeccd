//! Credit governor service entry point.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use credit_governor_service::{create_router, AppState, ServiceConfig};
use credit_governor_store::{RedisConfig, RedisStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,credit_governor=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting credit governor service");

    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        daily_cap = ?config.governor.daily_cap,
        max_generations_per_content = config.governor.max_generations_per_content,
        trial_credits = config.governor.trial_credits,
        key_prefix = %config.governor.key_prefix,
        stripe_configured = config.stripe_webhook_secret.is_some(),
        "Service configuration loaded"
    );

    let redis_config = RedisConfig::default().response_timeout(config.governor.store_timeout);
    let store = RedisStore::connect_with(&config.redis_url, redis_config).await?;

    let state = AppState::new(Arc::new(store), config.clone())?;
    let app = create_router(state);

    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
