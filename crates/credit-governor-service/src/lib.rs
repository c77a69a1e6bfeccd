//! Credit governor HTTP service.
//!
//! A thin adapter over the credit governor engine:
//!
//! - Credit status per account (grants the one-time trial on first access)
//! - Metered gate for calling services: authorize and refund
//! - Stripe webhooks, turned into exactly-once credit awards
//! - Dead-letter inspection and resolution for failed awards
//!
//! # Authentication
//!
//! API endpoints require the service API key in `X-API-Key`. Stripe webhooks
//! are authenticated by their `Stripe-Signature` header instead.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result

pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod stripe;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
