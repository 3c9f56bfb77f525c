// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Create-path tests: encrypt, write, confirm, then refresh

use super::support::{build_controller, FakeFhe, FakeLedger, Harness, ACCOUNT, REGISTRY};
use async_trait::async_trait;
use confidential_tryon::contracts::LedgerError;
use confidential_tryon::fhe::{EncryptedInput, EncryptionGateway, GatewayError};
use confidential_tryon::sessions::{
    ConfidentialValueState, NewSession, SessionError, TransactionState,
};
use ethers::types::Address;
use mockall::mock;
use std::sync::atomic::Ordering;
use std::sync::Arc;

mock! {
    pub Gateway {}

    #[async_trait]
    impl EncryptionGateway for Gateway {
        async fn encrypt(
            &self,
            contract: Address,
            account: Address,
            value: u32,
        ) -> Result<EncryptedInput, GatewayError>;
    }
}

#[tokio::test]
async fn test_create_then_refresh_yields_one_sealed_session() {
    let h = Harness::new();

    let created = h
        .controller
        .create_session(NewSession::new("A", 60, 170))
        .await
        .unwrap();
    let sessions = h.controller.refresh_sessions().await;

    let matching: Vec<_> = sessions.iter().filter(|s| s.label == "A").collect();
    assert_eq!(matching.len(), 1);
    assert_eq!(matching[0].id, created.id);
    assert_eq!(matching[0].public_field, 60);
    assert_eq!(matching[0].verification, ConfidentialValueState::Sealed);
    assert_eq!(matching[0].tag, "Virtual Try-On: dress");
    assert_eq!(matching[0].accessor_hint, 0);
}

#[tokio::test]
async fn test_create_encrypts_height_for_registry_and_account() {
    let h = Harness::new();

    let session = h
        .controller
        .create_session(NewSession::new("Summer look", 58, 165).with_clothing_type("jacket"))
        .await
        .unwrap();

    assert_eq!(h.fhe.last_encrypted(), Some((REGISTRY, ACCOUNT, 165)));
    assert!(session.id.starts_with("tryon-"));
    assert_eq!(session.tag, "Virtual Try-On: jacket");

    let stored = h.ledger.record_of(&session.id).unwrap();
    assert_eq!(stored.public_field, 58);
    assert!(!stored.is_verified);
    assert_eq!(
        h.controller.transaction_state(),
        TransactionState::Succeeded("Virtual try-on created successfully!".to_string())
    );
}

#[tokio::test]
async fn test_create_ids_are_unique() {
    let h = Harness::new();

    let first = h.controller.create_session(NewSession::new("one", 60, 170)).await.unwrap();
    let second = h.controller.create_session(NewSession::new("two", 61, 171)).await.unwrap();

    assert_ne!(first.id, second.id);
    assert_eq!(h.controller.sessions().await.len(), 2);
}

#[tokio::test]
async fn test_create_without_account_is_rejected_before_any_call() {
    let ledger = Arc::new(FakeLedger::new());
    let fhe = Arc::new(FakeFhe::new());
    let controller = build_controller(ledger.clone(), fhe.clone(), fhe.clone());

    let result = controller.create_session(NewSession::new("A", 60, 170)).await;

    assert_eq!(result, Err(SessionError::NotAuthenticated));
    assert_eq!(fhe.calls(), 0);
    assert_eq!(ledger.writes(), 0);
    assert_eq!(
        controller.transaction_state(),
        TransactionState::Failed("Please connect wallet first".to_string())
    );
}

#[tokio::test]
async fn test_gateway_failure_leaves_list_unchanged() {
    let ledger = Arc::new(FakeLedger::new());
    let fhe = Arc::new(FakeFhe::new());
    let mut gateway = MockGateway::new();
    gateway
        .expect_encrypt()
        .withf(|contract, account, value| {
            *contract == REGISTRY && *account == ACCOUNT && *value == 170
        })
        .times(1)
        .returning(|_, _, _| Err(GatewayError::Unavailable("relayer offline".to_string())));

    let controller =
        build_controller(ledger.clone(), Arc::new(gateway), fhe.clone()).with_account(ACCOUNT);
    let before = controller.sessions().await;

    let result = controller.create_session(NewSession::new("A", 60, 170)).await;

    assert!(matches!(result, Err(SessionError::SubmissionFailed(_))));
    assert_eq!(controller.sessions().await, before);
    assert_eq!(ledger.creates.load(Ordering::SeqCst), 0);
    match controller.transaction_state() {
        TransactionState::Failed(message) => assert!(message.starts_with("Submission failed")),
        other => panic!("unexpected state {:?}", other),
    }
}

#[tokio::test]
async fn test_user_rejection_is_reported_and_nothing_is_added() {
    let h = Harness::new();
    h.ledger.fail_creates_with(LedgerError::Rejected);

    let result = h.controller.create_session(NewSession::new("A", 60, 170)).await;

    assert_eq!(result, Err(SessionError::UserRejected));
    assert!(h.controller.sessions().await.is_empty());
    assert_eq!(
        h.controller.transaction_state(),
        TransactionState::Failed("Transaction rejected by user".to_string())
    );
}

#[tokio::test]
async fn test_reverted_write_is_submission_failure() {
    let h = Harness::new();
    h.ledger
        .fail_creates_with(LedgerError::Reverted("Business ID already exists".to_string()));

    let err = h
        .controller
        .create_session(NewSession::new("A", 60, 170))
        .await
        .unwrap_err();

    assert!(err.is_retryable());
    assert!(err.to_string().contains("Business ID already exists"));
    assert!(h.controller.sessions().await.is_empty());
}
