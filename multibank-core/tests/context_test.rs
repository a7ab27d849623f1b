//! Aggregator context: settings, connection management and offline paths
//!
//! Nothing here reaches a real bank. Banks point at a closed local port, so
//! only paths that must not touch the network are exercised.

use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;

use multibank_core::adapters::delay::RecordingDelay;
use multibank_core::{AggregatorContext, BankAccountRequest, BankConnection, PaymentConsentRequest};

const OFFLINE_URL: &str = "http://127.0.0.1:9";

fn write_settings(dir: &TempDir, value: serde_json::Value) {
    std::fs::write(
        dir.path().join("settings.json"),
        serde_json::to_string_pretty(&value).unwrap(),
    )
    .unwrap();
}

#[test]
fn test_context_registers_configured_banks() {
    let dir = TempDir::new().unwrap();
    write_settings(
        &dir,
        json!({
            "banks": [
                { "name": "vbank", "apiBaseUrl": OFFLINE_URL, "clientId": "team", "clientSecret": "s" },
                { "name": "abank", "apiBaseUrl": OFFLINE_URL, "clientId": "team", "clientSecret": "s" },
                { "name": "broken", "apiBaseUrl": "not a url", "clientId": "team", "clientSecret": "s" }
            ]
        }),
    );

    let ctx = AggregatorContext::new(dir.path()).unwrap();
    assert_eq!(ctx.aggregation_service.list_connected(), vec!["abank", "vbank"]);
}

#[test]
fn test_connect_and_disconnect_survive_restart() {
    let dir = TempDir::new().unwrap();

    {
        let mut ctx = AggregatorContext::new(dir.path()).unwrap();
        ctx.connect(BankConnection::new("vbank", OFFLINE_URL, "team", "s"))
            .unwrap();
        ctx.connect(BankConnection::new("sbank", OFFLINE_URL, "team", "s"))
            .unwrap();
        assert!(ctx.disconnect("sbank").unwrap());
        assert!(!ctx.disconnect("sbank").unwrap());
    }

    let ctx = AggregatorContext::new(dir.path()).unwrap();
    assert_eq!(ctx.aggregation_service.list_connected(), vec!["vbank"]);
}

#[test]
fn test_connect_rejects_invalid_connection() {
    let dir = TempDir::new().unwrap();
    let mut ctx = AggregatorContext::new(dir.path()).unwrap();

    assert!(ctx
        .connect(BankConnection::new("vbank", "ftp://vbank.example", "team", "s"))
        .is_err());
    assert!(ctx.config.banks.is_empty());
    assert!(!dir.path().join("settings.json").exists());
}

#[tokio::test]
async fn test_persisted_consent_reused_without_network() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("consents_vbank.json"),
        r#"{ "team-1": "consent-from-last-run" }"#,
    )
    .unwrap();

    let mut ctx =
        AggregatorContext::with_delay(dir.path(), Arc::new(RecordingDelay::new())).unwrap();
    ctx.connect(BankConnection::new("vbank", OFFLINE_URL, "team", "s"))
        .unwrap();

    let client = ctx.aggregation_service.client("vbank").unwrap();
    assert_eq!(
        client.ensure_consent("team-1").await.unwrap(),
        "consent-from-last-run"
    );
}

#[tokio::test]
async fn test_unconnected_banks_yield_none() {
    let dir = TempDir::new().unwrap();
    let ctx = AggregatorContext::with_delay(dir.path(), Arc::new(RecordingDelay::new())).unwrap();
    let service = &ctx.aggregation_service;

    let customers = vec!["team-1".to_string()];
    assert!(service.fetch_accounts("vbank", &customers).await.is_none());
    assert!(service.request_account_consent("vbank", "team-1").await.is_none());
    assert!(service
        .execute_payment("vbank", "team-1", "pc-1", json!({}))
        .await
        .is_none());

    let request: PaymentConsentRequest = serde_json::from_value(json!({
        "consent_type": "vrp",
        "requesting_bank": "team",
        "client_id": "team-1",
        "debtor_account": "4081",
        "vrp_max_individual_amount": "100",
        "vrp_daily_limit": "500",
        "vrp_monthly_limit": "5000"
    }))
    .unwrap();
    assert!(service.request_payment_consent("vbank", &request).await.is_none());

    let results = service
        .fetch_accounts_multi(&[
            BankAccountRequest::new("vbank", customers.clone()),
            BankAccountRequest::new("abank", customers),
        ])
        .await;
    assert_eq!(results.len(), 2);
    assert!(results.values().all(Option::is_none));
}
