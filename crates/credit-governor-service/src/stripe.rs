//! Stripe webhook ingress: signature verification and event mapping.
//!
//! Stripe signs `"{timestamp}.{body}"` with the endpoint secret and sends
//! `Stripe-Signature: t=<unix seconds>,v1=<hex tag>[,v1=<hex tag>...]`.
//! Several `v1` tags appear while a secret is being rolled; any match passes.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use credit_governor_core::{AccountId, EventId, IdError, PaymentEvent, PaymentEventKind};

use crate::crypto::{hmac_sha256_hex, verify_hmac_sha256_hex};

/// Default maximum age of a signed payload.
pub const DEFAULT_SIGNATURE_TOLERANCE: Duration = Duration::from_secs(300);

/// Event type that carries purchased credits.
pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

/// Signature verification failures.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    /// The header has no timestamp or no `v1` tag.
    #[error("malformed signature header")]
    MalformedHeader,

    /// No `v1` tag matches the payload.
    #[error("no signature matches the payload")]
    NoMatch,

    /// The signed timestamp is outside the tolerance.
    #[error("signature timestamp outside tolerance ({age_secs}s)")]
    Expired {
        /// Age of the signature in seconds (negative if in the future).
        age_secs: i64,
    },

    /// The signing key was rejected.
    #[error("invalid signing key")]
    InvalidKey,
}

/// Verify a `Stripe-Signature` header against the raw request body.
///
/// # Errors
///
/// Returns a `SignatureError` describing why the payload must be rejected.
pub fn verify_signature(
    payload: &str,
    header: &str,
    secret: &str,
    tolerance: Option<Duration>,
    now: DateTime<Utc>,
) -> Result<(), SignatureError> {
    let mut timestamp: Option<&str> = None;
    let mut tags: Vec<&str> = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", ts)) => timestamp = Some(ts),
            Some(("v1", tag)) => tags.push(tag),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MalformedHeader)?;
    let signed_at: i64 = timestamp
        .parse()
        .map_err(|_| SignatureError::MalformedHeader)?;
    if tags.is_empty() {
        return Err(SignatureError::MalformedHeader);
    }

    let signed_payload = format!("{timestamp}.{payload}");
    if !tags
        .iter()
        .any(|tag| verify_hmac_sha256_hex(secret, &signed_payload, tag))
    {
        return Err(SignatureError::NoMatch);
    }

    if let Some(tolerance) = tolerance {
        let age_secs = now.timestamp() - signed_at;
        let limit = i64::try_from(tolerance.as_secs()).unwrap_or(i64::MAX);
        if age_secs.abs() > limit {
            return Err(SignatureError::Expired { age_secs });
        }
    }

    Ok(())
}

/// Produce a `Stripe-Signature` header value for `payload`.
///
/// # Errors
///
/// Returns `InvalidKey` if the secret is rejected.
pub fn sign_payload(payload: &str, secret: &str, timestamp: i64) -> Result<String, SignatureError> {
    let tag = hmac_sha256_hex(secret, &format!("{timestamp}.{payload}"))
        .map_err(|_| SignatureError::InvalidKey)?;
    Ok(format!("t={timestamp},v1={tag}"))
}

/// Stripe event envelope.
#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    /// Event id (`evt_...`).
    pub id: String,
    /// Event type.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Event data.
    pub data: StripeEventData,
}

/// Stripe event data container.
#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    /// The object the event is about.
    pub object: serde_json::Value,
}

impl StripeEvent {
    /// Map the envelope to a provider-neutral payment event.
    ///
    /// For completed checkouts, the account comes from `client_reference_id`
    /// and the amount from `metadata.credits` (a decimal string). Missing or
    /// unparsable values map to `None` and the event is later dropped as
    /// malformed.
    ///
    /// # Errors
    ///
    /// Returns an error if the event id is not a valid identifier.
    pub fn into_payment_event(self) -> Result<PaymentEvent, IdError> {
        let id = EventId::new(self.id)?;
        let object = self.data.object;

        if self.event_type != CHECKOUT_COMPLETED {
            return Ok(PaymentEvent {
                id,
                kind: PaymentEventKind::Other(self.event_type),
                account: None,
                credits: None,
                payload: object,
            });
        }

        let account = object
            .get("client_reference_id")
            .and_then(serde_json::Value::as_str)
            .and_then(|s| AccountId::new(s).ok());

        let credits = object
            .get("metadata")
            .and_then(|m| m.get("credits"))
            .and_then(|v| match v {
                serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
                serde_json::Value::Number(n) => n.as_i64(),
                _ => None,
            });

        Ok(PaymentEvent {
            id,
            kind: PaymentEventKind::CheckoutCompleted,
            account,
            credits,
            payload: object,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const SECRET: &str = "whsec_test";

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn signed_payload_verifies() {
        let header = sign_payload("{}", SECRET, 1_700_000_000).unwrap();
        verify_signature(
            "{}",
            &header,
            SECRET,
            Some(DEFAULT_SIGNATURE_TOLERANCE),
            at(1_700_000_010),
        )
        .unwrap();
    }

    #[test]
    fn any_matching_tag_passes() {
        let good = sign_payload("{}", SECRET, 1_700_000_000).unwrap();
        let tag = good.split_once(",v1=").unwrap().1;
        let header = format!("t=1700000000,v1={},v1={tag}", "0".repeat(64));
        verify_signature("{}", &header, SECRET, None, at(0)).unwrap();
    }

    #[test]
    fn tampered_body_or_wrong_secret_fails() {
        let header = sign_payload("{\"a\":1}", SECRET, 1_700_000_000).unwrap();
        assert!(matches!(
            verify_signature("{\"a\":2}", &header, SECRET, None, at(1_700_000_000)),
            Err(SignatureError::NoMatch)
        ));
        assert!(matches!(
            verify_signature("{\"a\":1}", &header, "whsec_other", None, at(1_700_000_000)),
            Err(SignatureError::NoMatch)
        ));
    }

    #[test]
    fn malformed_headers_fail() {
        for header in ["", "v1=abc", "t=1700000000", "t=soon,v1=abc"] {
            assert!(
                matches!(
                    verify_signature("{}", header, SECRET, None, at(0)),
                    Err(SignatureError::MalformedHeader)
                ),
                "header {header:?} was accepted"
            );
        }
    }

    #[test]
    fn stale_signature_fails_when_tolerance_is_set() {
        let header = sign_payload("{}", SECRET, 1_700_000_000).unwrap();
        let late = at(1_700_000_000 + 301);
        assert!(matches!(
            verify_signature("{}", &header, SECRET, Some(DEFAULT_SIGNATURE_TOLERANCE), late),
            Err(SignatureError::Expired { age_secs: 301 })
        ));
        verify_signature("{}", &header, SECRET, None, late).unwrap();
    }

    fn event(event_type: &str, object: serde_json::Value) -> StripeEvent {
        serde_json::from_value(json!({
            "id": "evt_42",
            "type": event_type,
            "data": { "object": object }
        }))
        .unwrap()
    }

    #[test]
    fn checkout_maps_account_and_credits() {
        let payment = event(
            CHECKOUT_COMPLETED,
            json!({ "client_reference_id": "user-1", "metadata": { "credits": "60" } }),
        )
        .into_payment_event()
        .unwrap();

        assert_eq!(payment.id.as_str(), "evt_42");
        assert_eq!(payment.kind, PaymentEventKind::CheckoutCompleted);
        assert_eq!(payment.account.as_ref().map(AccountId::as_str), Some("user-1"));
        assert_eq!(payment.credits, Some(60));
        assert!(payment.award_target().is_some());
    }

    #[test]
    fn checkout_without_reference_or_credits_has_no_target() {
        let payment = event(CHECKOUT_COMPLETED, json!({ "metadata": { "credits": "sixty" } }))
            .into_payment_event()
            .unwrap();
        assert_eq!(payment.account, None);
        assert_eq!(payment.credits, None);
        assert!(payment.award_target().is_none());
    }

    #[test]
    fn other_types_are_kept_by_name() {
        let payment = event("invoice.paid", json!({}))
            .into_payment_event()
            .unwrap();
        assert_eq!(payment.kind, PaymentEventKind::Other("invoice.paid".into()));
    }
}
