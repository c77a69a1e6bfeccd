//! Dead-letter administration integration tests.

mod common;

use common::{checkout_event, TestHarness};
use credit_governor_store::CounterStore;

/// Fail one award so a dead letter exists for `event_id`, then repair the balance.
async fn dead_letter(harness: &TestHarness, event_id: &str, credits: &str) {
    let balance_key = harness.keys.balance(&harness.account);
    harness.store.set(&balance_key, "corrupt", None).await.unwrap();

    harness
        .stripe_webhook(&checkout_event(event_id, &harness.account, credits))
        .await
        .assert_status(axum::http::StatusCode::INTERNAL_SERVER_ERROR);

    harness.store.delete(&balance_key).await.unwrap();
}

#[tokio::test]
async fn dead_letter_can_be_inspected() {
    let harness = TestHarness::new();
    dead_letter(&harness, "evt_dl", "25").await;

    let response = harness.authed_get("/v1/admin/dead-letters/evt_dl").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["event_id"], "evt_dl");
    assert_eq!(body["account"], harness.account.as_str());
    assert_eq!(body["amount"], 25);
    assert_eq!(body["payload"]["id"], "cs_test_123");
}

#[tokio::test]
async fn resolving_awards_once_and_clears_record() {
    let harness = TestHarness::new();
    dead_letter(&harness, "evt_dl", "25").await;

    let response = harness
        .authed_post("/v1/admin/dead-letters/evt_dl/resolve")
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["eventId"], "evt_dl");
    assert_eq!(body["balance"], 25);

    harness
        .authed_get("/v1/admin/dead-letters/evt_dl")
        .await
        .assert_status_not_found();
    harness
        .authed_post("/v1/admin/dead-letters/evt_dl/resolve")
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn unknown_dead_letter_is_not_found() {
    let harness = TestHarness::new();

    harness
        .authed_get("/v1/admin/dead-letters/evt_missing")
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn admin_requires_api_key() {
    let harness = TestHarness::new();

    harness
        .server
        .get("/v1/admin/dead-letters/evt_any")
        .await
        .assert_status_unauthorized();
}
