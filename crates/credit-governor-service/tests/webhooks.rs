//! Stripe webhook integration tests.

mod common;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use common::{checkout_event, TestHarness, WEBHOOK_SECRET};
use credit_governor_service::stripe::sign_payload;
use credit_governor_service::ServiceConfig;
use credit_governor_store::CounterStore;
use serde_json::json;

async fn balance(harness: &TestHarness) -> Option<i64> {
    harness
        .store
        .get_int(&harness.keys.balance(&harness.account))
        .await
        .unwrap()
}

#[tokio::test]
async fn checkout_awards_credits_once() {
    let harness = TestHarness::new();
    let body = checkout_event("evt_42", &harness.account, "60");

    let response = harness.stripe_webhook(&body).await;
    response.assert_status_ok();
    response.assert_json(&json!({ "received": true }));
    assert_eq!(balance(&harness).await, Some(60));

    let response = harness.stripe_webhook(&body).await;
    response.assert_status_ok();
    response.assert_json(&json!({ "received": true, "idempotent": true }));
    assert_eq!(balance(&harness).await, Some(60));
}

#[tokio::test]
async fn malformed_checkout_is_acknowledged_without_award() {
    let harness = TestHarness::new();

    for (event_id, credits) in [("evt_zero", "0"), ("evt_text", "sixty"), ("evt_neg", "-5")] {
        harness
            .stripe_webhook(&checkout_event(event_id, &harness.account, credits))
            .await
            .assert_status_ok();
    }

    let no_reference = json!({
        "id": "evt_noref",
        "type": "checkout.session.completed",
        "data": { "object": { "metadata": { "credits": "10" } } }
    })
    .to_string();
    harness
        .stripe_webhook(&no_reference)
        .await
        .assert_status_ok();

    assert_eq!(balance(&harness).await, None);
}

#[tokio::test]
async fn other_event_types_are_acknowledged() {
    let harness = TestHarness::new();
    let body = json!({
        "id": "evt_invoice",
        "type": "invoice.paid",
        "data": { "object": {} }
    })
    .to_string();

    let response = harness.stripe_webhook(&body).await;

    response.assert_status_ok();
    response.assert_json(&json!({ "received": true }));
}

#[tokio::test]
async fn missing_signature_is_rejected() {
    let harness = TestHarness::new();
    let body = checkout_event("evt_unsigned", &harness.account, "60");

    let response = harness.server.post("/webhooks/stripe").text(&body).await;

    response.assert_status_bad_request();
    assert_eq!(balance(&harness).await, None);
}

#[tokio::test]
async fn bad_signature_is_rejected() {
    let harness = TestHarness::new();
    let body = checkout_event("evt_forged", &harness.account, "60");
    let header = sign_payload(&body, "whsec_wrong", chrono::Utc::now().timestamp()).unwrap();

    let response = harness
        .server
        .post("/webhooks/stripe")
        .add_header(
            HeaderName::from_static("stripe-signature"),
            HeaderValue::from_str(&header).unwrap(),
        )
        .text(&body)
        .await;

    response.assert_status_bad_request();
    assert_eq!(balance(&harness).await, None);
}

#[tokio::test]
async fn stale_signature_is_rejected() {
    let harness = TestHarness::new();
    let body = checkout_event("evt_replayed", &harness.account, "60");
    let an_hour_ago = chrono::Utc::now().timestamp() - 3600;
    let header = sign_payload(&body, WEBHOOK_SECRET, an_hour_ago).unwrap();

    let response = harness
        .server
        .post("/webhooks/stripe")
        .add_header(
            HeaderName::from_static("stripe-signature"),
            HeaderValue::from_str(&header).unwrap(),
        )
        .text(&body)
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn unparsable_body_is_rejected() {
    let harness = TestHarness::new();

    harness
        .stripe_webhook("not json")
        .await
        .assert_status_bad_request();
}

#[tokio::test]
async fn webhooks_are_refused_without_secret() {
    let harness = TestHarness::with_config(ServiceConfig {
        stripe_webhook_secret: None,
        ..ServiceConfig::default()
    });

    let response = harness
        .stripe_webhook(&checkout_event("evt_1", &harness.account, "5"))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn failed_award_returns_server_error_and_dead_letters() {
    let harness = TestHarness::new();
    let balance_key = harness.keys.balance(&harness.account);
    // A corrupt balance makes the increment fail.
    harness.store.set(&balance_key, "corrupt", None).await.unwrap();

    let body = checkout_event("evt_fail", &harness.account, "60");
    let response = harness.stripe_webhook(&body).await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);

    let record = harness
        .store
        .get_raw("stripe:dead_letter:evt_fail")
        .await
        .unwrap()
        .expect("dead letter written");
    let record: serde_json::Value = serde_json::from_str(&record).unwrap();
    assert_eq!(record["amount"], 60);
    assert_eq!(record["account"], harness.account.as_str());

    // Redelivery is acknowledged; the dead letter waits for an operator.
    let response = harness.stripe_webhook(&body).await;
    response.assert_status_ok();
    response.assert_json(&json!({ "received": true, "idempotent": true }));
}
