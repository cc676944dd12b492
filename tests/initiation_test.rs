mod common;

use bigdecimal::BigDecimal;
use serde_json::json;

use common::TestHarness;
use shwary_gateway::domain::{Country, EntityRef, TransactionStatus};
use shwary_gateway::error::AppError;
use shwary_gateway::ports::TransactionRepository;

#[tokio::test]
async fn test_successful_initiation_records_provider_identifier() {
    let harness = TestHarness::new();
    harness.provider.set_initiate_success("SHW-123", "pending");

    let txn = harness
        .service
        .initiate(
            Some(EntityRef::new("order", "42")),
            BigDecimal::from(1000),
            "+243810000000",
            Country::Drc,
            "CDF",
            None,
        )
        .await
        .unwrap();

    assert_eq!(txn.shwary_id.as_deref(), Some("SHW-123"));
    assert_eq!(txn.status, TransactionStatus::Pending);
    assert!(txn.error_message.is_none());
    assert_eq!(txn.raw_response.unwrap()["id"], "SHW-123");

    let stored = harness.repository.get_by_id(txn.id).await.unwrap();
    assert_eq!(stored.shwary_id.as_deref(), Some("SHW-123"));
    assert_eq!(stored.related_type.as_deref(), Some("order"));
    assert_eq!(stored.related_id.as_deref(), Some("42"));
}

#[tokio::test]
async fn test_failed_initiation_leaves_a_failed_record_and_reraises() {
    let harness = TestHarness::new();
    harness.provider.set_initiate_failure("Timeout", None);

    let result = harness
        .service
        .initiate(
            None,
            BigDecimal::from(1000),
            "+243810000000",
            Country::Drc,
            "CDF",
            None,
        )
        .await;

    let error = result.unwrap_err();
    assert!(matches!(error, AppError::Provider(_)));
    assert!(error.to_string().contains("Timeout"));

    // The record is never left dangling: the sole row is terminal, with
    // a message, identifier still unset.
    let rows = harness.repository.all().await;
    assert_eq!(rows.len(), 1);
    let stored = &rows[0];
    assert_eq!(stored.status, TransactionStatus::Failed);
    assert!(stored.shwary_id.is_none());
    assert!(stored.error_message.as_deref().unwrap().contains("Timeout"));
}

#[tokio::test]
async fn test_failed_initiation_keeps_structured_error_payload() {
    let harness = TestHarness::new();
    let api_body = json!({"message": "Insufficient merchant balance", "code": "BALANCE"});
    harness
        .provider
        .set_initiate_failure("Insufficient merchant balance", Some(api_body.clone()));

    let result = harness
        .service
        .initiate(
            Some(EntityRef::new("invoice", "7")),
            BigDecimal::from(250),
            "+254700000001",
            Country::Ke,
            "KES",
            Some("https://override.example/hook".to_string()),
        )
        .await;
    assert!(result.is_err());

    let rows = harness.repository.all().await;
    assert_eq!(rows.len(), 1);
    let stored = &rows[0];
    assert_eq!(stored.status, TransactionStatus::Failed);
    assert_eq!(stored.raw_response, Some(api_body));
    assert!(stored
        .error_message
        .as_deref()
        .unwrap()
        .contains("Insufficient merchant balance"));
}

#[tokio::test]
async fn test_initiation_rejects_non_positive_amount() {
    let harness = TestHarness::new();
    harness.provider.set_initiate_success("SHW-1", "pending");

    let result = harness
        .service
        .initiate(
            None,
            BigDecimal::from(0),
            "+243810000000",
            Country::Drc,
            "CDF",
            None,
        )
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_initiation_rejects_empty_phone_number() {
    let harness = TestHarness::new();
    harness.provider.set_initiate_success("SHW-1", "pending");

    let result = harness
        .service
        .initiate(None, BigDecimal::from(100), "  ", Country::Ug, "UGX", None)
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_provider_confirmed_status_is_taken_verbatim() {
    // Some providers complete instantly in sandbox mode.
    let harness = TestHarness::new();
    harness.provider.set_initiate_success("SHW-FAST", "completed");

    let txn = harness
        .service
        .initiate(
            None,
            BigDecimal::from(100),
            "+243810000000",
            Country::Drc,
            "CDF",
            None,
        )
        .await
        .unwrap();

    assert_eq!(txn.status, TransactionStatus::Completed);
    assert!(txn.is_successful());
}

#[tokio::test]
async fn test_check_status_returns_none_for_unknown_identifier() {
    let harness = TestHarness::new();
    harness.provider.set_status("SHW-404", "completed");

    let status = harness.service.check_status("SHW-404").await.unwrap();
    assert!(status.is_none());
}

#[tokio::test]
async fn test_check_status_reconciles_and_fires_events() {
    let harness = TestHarness::new();
    let txn = harness.seed_pending("SHW-7").await;
    harness.provider.set_status("SHW-7", "completed");

    let status = harness.service.check_status("SHW-7").await.unwrap();
    assert_eq!(status, Some(TransactionStatus::Completed));

    let stored = harness.repository.get_by_id(txn.id).await.unwrap();
    assert_eq!(stored.status, TransactionStatus::Completed);
    assert_eq!(
        harness.recorder.kinds(),
        vec!["status_changed", "payment_succeeded"]
    );
}
