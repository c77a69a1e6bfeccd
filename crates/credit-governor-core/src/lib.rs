//! Core types for the prepaid credit governor.
//!
//! This crate provides the vocabulary shared by the store adapter, the engine
//! and the HTTP service:
//!
//! - **Identifiers**: `AccountId`, `EventId`, `ContentFingerprint`
//! - **Outcomes**: `DebitOutcome`, `DebitRejection`, `TrialGrant`, `GateDenial`
//! - **Payments**: `PaymentEvent`, `PaymentEventKind`, `DeadLetterRecord`
//! - **Limits**: default quotas and retention windows
//!
//! # Credit Unit
//!
//! One credit pays for one metered operation. Balances are stored as `i64`
//! and are never negative.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod ids;
pub mod limits;
pub mod outcome;
pub mod payment;

pub use ids::{AccountId, ContentFingerprint, EventId, IdError, OperationId};
pub use outcome::{DebitOutcome, DebitRejection, GateDenial, TrialGrant};
pub use payment::{DeadLetterRecord, PaymentEvent, PaymentEventKind};
