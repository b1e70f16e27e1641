//! Lifecycle coverage through the security gateway: creation, settlement,
//! declines, the retry budget, cancellation, and expiry.

mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use common::*;
use payment_sessions_api::errors::PaymentError;
use payment_sessions_api::models::{CreateSessionRequest, SessionStatus};
use rust_decimal_macros::dec;

#[tokio::test]
async fn created_sessions_start_pending_with_a_fresh_identity() {
    let app = TestApp::new();
    let session = app.create_session(dec!(150), "EUR").await;

    assert!(session.id.starts_with("ps_"));
    assert_eq!(session.status, SessionStatus::Pending);
    assert_eq!(session.attempts, 0);
    assert_eq!(session.amount, dec!(150));
    assert_eq!(session.currency, "EUR");
    assert_eq!(
        session.expires_at - session.created_at,
        chrono::Duration::minutes(30)
    );

    let snapshot = app.gateway.session_snapshot(&session.id).unwrap();
    assert_eq!(snapshot.status, SessionStatus::Pending);
}

#[tokio::test]
async fn currency_is_normalized_to_uppercase() {
    let app = TestApp::new();
    let session = app.create_session(dec!(20), "eur").await;
    assert_eq!(session.currency, "EUR");
}

#[tokio::test]
async fn amounts_above_the_policy_maximum_are_rejected() {
    let app = TestApp::new();
    let err = app
        .gateway
        .create_session(CreateSessionRequest {
            amount: dec!(50000),
            currency: "EUR".to_string(),
        })
        .await
        .unwrap_err();
    assert_matches!(err, PaymentError::ValidationError(msg) if msg == "Maximum amount is 10000");
    assert!(app.store.is_empty());
}

#[tokio::test]
async fn a_valid_submission_completes_the_session_exactly_once() {
    let app = TestApp::new();
    let session = app.create_session(dec!(150), "EUR").await;

    let receipt = app
        .gateway
        .submit_payment(&session.id, valid_card())
        .await
        .expect("payment should settle");
    assert_eq!(receipt.session_id, session.id);
    assert_eq!(receipt.masked_number, "************1111");
    assert!(!receipt.transaction_id.is_empty());

    let snapshot = app.gateway.session_snapshot(&session.id).unwrap();
    assert_eq!(snapshot.status, SessionStatus::Completed);
    assert_eq!(snapshot.attempts, 1);

    let err = app
        .gateway
        .submit_payment(&session.id, valid_card())
        .await
        .unwrap_err();
    assert_matches!(err, PaymentError::SessionAlreadyProcessed);
}

#[tokio::test]
async fn a_definitive_decline_fails_the_session() {
    let app = TestApp::with_processor(Arc::new(DecliningProcessor));
    let session = app.create_session(dec!(150), "EUR").await;

    let err = app
        .gateway
        .submit_payment(&session.id, valid_card())
        .await
        .unwrap_err();
    assert_matches!(err, PaymentError::SettlementFailed(reason) if reason == "card declined by issuer");

    let snapshot = app.gateway.session_snapshot(&session.id).unwrap();
    assert_eq!(snapshot.status, SessionStatus::Failed);
    assert_eq!(snapshot.attempts, 1);

    let err = app
        .gateway
        .submit_payment(&session.id, valid_card())
        .await
        .unwrap_err();
    assert_matches!(err, PaymentError::SessionAlreadyProcessed);
}

#[tokio::test]
async fn transport_failures_consume_the_budget_but_leave_the_session_pending() {
    let app = TestApp::with_processor(Arc::new(TransportErrorProcessor));
    let session = app.create_session(dec!(150), "EUR").await;

    for expected_attempts in 1..=3u32 {
        let err = app
            .gateway
            .submit_payment(&session.id, valid_card())
            .await
            .unwrap_err();
        assert_matches!(err, PaymentError::SettlementFailed(_));

        let snapshot = app.gateway.session_snapshot(&session.id).unwrap();
        assert_eq!(snapshot.status, SessionStatus::Pending);
        assert_eq!(snapshot.attempts, expected_attempts);
    }

    // The attempt that would exceed the budget is refused and finalizes
    // the session in one step.
    let err = app
        .gateway
        .submit_payment(&session.id, valid_card())
        .await
        .unwrap_err();
    assert_matches!(err, PaymentError::RetriesExceeded);

    let snapshot = app.gateway.session_snapshot(&session.id).unwrap();
    assert_eq!(snapshot.status, SessionStatus::Failed);
    assert_eq!(snapshot.attempts, 3);

    // Once failed, later submissions see a processed session, not the
    // budget error again.
    let err = app
        .gateway
        .submit_payment(&session.id, valid_card())
        .await
        .unwrap_err();
    assert_matches!(err, PaymentError::SessionAlreadyProcessed);
}

#[tokio::test]
async fn cancellation_is_effective_exactly_once() {
    let app = TestApp::new();
    let session = app.create_session(dec!(150), "EUR").await;

    assert!(app.gateway.cancel_session(&session.id).await.unwrap());
    let snapshot = app.gateway.session_snapshot(&session.id).unwrap();
    assert_eq!(snapshot.status, SessionStatus::Cancelled);

    // Through the gateway a cancelled session reads as already processed.
    let err = app.gateway.cancel_session(&session.id).await.unwrap_err();
    assert_matches!(err, PaymentError::SessionAlreadyProcessed);

    // The lifecycle manager itself reports a lost race as `false`.
    assert!(!app.service.cancel_payment(&session.id).await.unwrap());

    let err = app
        .gateway
        .submit_payment(&session.id, valid_card())
        .await
        .unwrap_err();
    assert_matches!(err, PaymentError::SessionAlreadyProcessed);
}

#[tokio::test]
async fn expired_sessions_are_rejected_before_any_sweep_runs() {
    let app = TestApp::with_policy(instant_expiry_policy());
    let session = app.create_session(dec!(150), "EUR").await;

    // Still present in the store, but no longer usable.
    assert!(app.store.get(&session.id).is_some());

    let err = app
        .gateway
        .submit_payment(&session.id, valid_card())
        .await
        .unwrap_err();
    assert_matches!(err, PaymentError::SessionExpired);

    let err = app.gateway.cancel_session(&session.id).await.unwrap_err();
    assert_matches!(err, PaymentError::SessionExpired);

    // After the sweep the record is gone and lookups say so.
    assert_eq!(app.store.sweep_expired(chrono::Utc::now()), 1);
    let err = app
        .gateway
        .submit_payment(&session.id, valid_card())
        .await
        .unwrap_err();
    assert_matches!(err, PaymentError::SessionNotFound(_));
}

#[tokio::test]
async fn card_checks_run_in_order_and_stop_at_the_first_failure() {
    let app = TestApp::new();
    let session = app.create_session(dec!(150), "EUR").await;

    // Bad number and bad CVV: the number check fires first.
    let mut card = valid_card();
    card.card_number = "4242424242424241".to_string();
    card.cvv = "12345".to_string();
    let err = app
        .gateway
        .submit_payment(&session.id, card)
        .await
        .unwrap_err();
    assert_matches!(err, PaymentError::ValidationError(msg) if msg == "Invalid card number");

    // Bad CVV and bad expiry: the CVV check fires first.
    let mut card = valid_card();
    card.cvv = "1234".to_string();
    card.expiry_month = 13;
    let err = app
        .gateway
        .submit_payment(&session.id, card)
        .await
        .unwrap_err();
    assert_matches!(err, PaymentError::ValidationError(msg) if msg == "CVV must be 3 digits");

    // Expired card on an otherwise valid submission.
    let mut card = valid_card();
    card.expiry_year = 2020;
    let err = app
        .gateway
        .submit_payment(&session.id, card)
        .await
        .unwrap_err();
    assert_matches!(err, PaymentError::ValidationError(msg) if msg == "Card is expired");

    // Rejected card data never consumes an attempt.
    let snapshot = app.gateway.session_snapshot(&session.id).unwrap();
    assert_eq!(snapshot.status, SessionStatus::Pending);
    assert_eq!(snapshot.attempts, 0);

    // The session check precedes card checks entirely.
    let mut card = valid_card();
    card.card_number = "not-a-number".to_string();
    let err = app
        .gateway
        .submit_payment("ps_missing", card)
        .await
        .unwrap_err();
    assert_matches!(err, PaymentError::SessionNotFound(_));
}

#[tokio::test]
async fn terminal_sessions_stay_readable_for_audit() {
    let app = TestApp::new();
    let session = app.create_session(dec!(150), "EUR").await;
    app.gateway
        .submit_payment(&session.id, valid_card())
        .await
        .expect("payment should settle");

    let snapshot = app.gateway.session_snapshot(&session.id).unwrap();
    assert_eq!(snapshot.status, SessionStatus::Completed);
    assert_eq!(snapshot.amount, dec!(150));
}
