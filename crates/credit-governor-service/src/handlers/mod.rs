//! API handlers.

pub mod admin;
pub mod credits;
pub mod gate;
pub mod health;
pub mod webhooks;
