// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Reveal-path tests: local reads, proof submission and the verification race

use super::support::{build_controller, FakeFhe, FakeLedger, Harness};
use confidential_tryon::contracts::LedgerError;
use confidential_tryon::sessions::{
    ConfidentialValueState, FitAnalysis, SessionError, TransactionState,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::Barrier;

#[tokio::test]
async fn test_reveal_of_verified_session_makes_no_calls() {
    let h = Harness::new();
    h.seed_verified("tryon-1", "Office", 60, 172);
    h.controller.refresh_sessions().await;
    let session = h.controller.session("tryon-1").await.unwrap();

    let reads = h.ledger.reads.load(Ordering::SeqCst);
    let value = h.controller.reveal_session(&session).await.unwrap();

    assert_eq!(value, Some(172));
    assert_eq!(h.ledger.reads.load(Ordering::SeqCst), reads);
    assert_eq!(h.ledger.writes(), 0);
    assert_eq!(h.fhe.calls(), 0);
    assert_eq!(
        h.controller.transaction_state(),
        TransactionState::Succeeded("Body data already verified on-chain".to_string())
    );
}

#[tokio::test]
async fn test_stale_caller_copy_does_not_bypass_verified_state() {
    let h = Harness::new();
    h.seed_verified("tryon-1", "Office", 60, 172);
    h.controller.refresh_sessions().await;

    let mut stale = h.controller.session("tryon-1").await.unwrap();
    stale.verification = ConfidentialValueState::Sealed;

    assert_eq!(h.controller.reveal_session(&stale).await.unwrap(), Some(172));
    assert_eq!(h.fhe.calls(), 0);
    assert_eq!(h.ledger.writes(), 0);
}

#[tokio::test]
async fn test_reveal_of_sealed_session_verifies_on_chain() {
    let h = Harness::new();
    h.seed_sealed("tryon-1", "Office", 60, 170);
    h.controller.refresh_sessions().await;
    let session = h.controller.session("tryon-1").await.unwrap();

    let value = h.controller.reveal_session(&session).await.unwrap();

    assert_eq!(value, Some(170));
    assert_eq!(h.ledger.verified_writes.load(Ordering::SeqCst), 1);
    assert_eq!(h.fhe.encrypt_calls.load(Ordering::SeqCst), 0);

    let after = h.controller.session("tryon-1").await.unwrap();
    assert_eq!(after.verification, ConfidentialValueState::OnChainVerified(170));
    assert!(after.confidential_handle.is_some());
    assert_eq!(
        h.controller.transaction_state(),
        TransactionState::Succeeded("Body data decrypted and verified successfully!".to_string())
    );
}

#[tokio::test]
async fn test_concurrent_reveals_settle_to_one_verification() {
    let h = Harness::with_fhe(FakeFhe::with_verify_barrier(Arc::new(Barrier::new(2))));
    h.seed_sealed("tryon-1", "Office", 60, 170);
    h.controller.refresh_sessions().await;
    let session = h.controller.session("tryon-1").await.unwrap();

    let (first, second) = tokio::join!(
        h.controller.reveal_session(&session),
        h.controller.reveal_session(&session)
    );

    let mut outcomes = vec![first.unwrap(), second.unwrap()];
    outcomes.sort();
    assert_eq!(outcomes, vec![None, Some(170)]);

    assert_eq!(h.ledger.verified_writes.load(Ordering::SeqCst), 1);
    assert_eq!(h.ledger.submits.load(Ordering::SeqCst), 2);
    assert_eq!(
        h.controller.session("tryon-1").await.unwrap().verification,
        ConfidentialValueState::OnChainVerified(170)
    );
    assert!(!matches!(
        h.controller.transaction_state(),
        TransactionState::Failed(_)
    ));
}

#[tokio::test]
async fn test_locally_revealed_reveal_is_idempotent() {
    let h = Harness::new();
    h.ledger.lagging_reads.store(true, Ordering::SeqCst);
    h.seed_sealed("tryon-1", "Office", 60, 170);
    h.controller.refresh_sessions().await;

    let session = h.controller.session("tryon-1").await.unwrap();
    let first = h.controller.reveal_session(&session).await.unwrap();

    let revealed = h.controller.session("tryon-1").await.unwrap();
    assert_eq!(revealed.verification, ConfidentialValueState::LocallyRevealed(170));

    let second = h.controller.reveal_session(&revealed).await.unwrap();
    assert_eq!(first, Some(170));
    assert_eq!(second, first);
    assert_eq!(
        h.controller.session("tryon-1").await.unwrap().verification,
        ConfidentialValueState::LocallyRevealed(170)
    );
}

#[tokio::test]
async fn test_precheck_adopts_verification_by_another_party() {
    let h = Harness::new();
    h.seed_sealed("tryon-1", "Office", 60, 170);
    h.controller.refresh_sessions().await;
    let session = h.controller.session("tryon-1").await.unwrap();

    h.ledger.mark_verified("tryon-1", 170);
    let value = h.controller.reveal_session(&session).await.unwrap();

    assert_eq!(value, Some(170));
    assert_eq!(h.fhe.verify_calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.ledger.submits.load(Ordering::SeqCst), 0);
    assert_eq!(
        h.controller.session("tryon-1").await.unwrap().verification,
        ConfidentialValueState::OnChainVerified(170)
    );
}

#[tokio::test]
async fn test_verifier_that_skips_submission_fails_reveal() {
    let h = Harness::new();
    h.fhe.skip_submission.store(true, Ordering::SeqCst);
    h.seed_sealed("tryon-1", "Office", 60, 170);
    h.controller.refresh_sessions().await;
    let session = h.controller.session("tryon-1").await.unwrap();

    let result = h.controller.reveal_session(&session).await;

    assert!(matches!(result, Err(SessionError::VerificationFailed(_))));
    assert_eq!(
        h.controller.session("tryon-1").await.unwrap().verification,
        ConfidentialValueState::Sealed
    );
    match h.controller.transaction_state() {
        TransactionState::Failed(message) => assert!(message.starts_with("Decryption failed")),
        other => panic!("unexpected state {:?}", other),
    }
}

#[tokio::test]
async fn test_reverted_proof_submission_fails_reveal() {
    let h = Harness::new();
    h.ledger
        .fail_submits_with(LedgerError::Reverted("Invalid decryption proof".to_string()));
    h.seed_sealed("tryon-1", "Office", 60, 170);
    h.controller.refresh_sessions().await;
    let session = h.controller.session("tryon-1").await.unwrap();

    let err = h.controller.reveal_session(&session).await.unwrap_err();

    assert!(err.to_string().contains("Invalid decryption proof"));
    assert_eq!(
        h.controller.session("tryon-1").await.unwrap().verification,
        ConfidentialValueState::Sealed
    );
}

#[tokio::test]
async fn test_reveal_requires_account() {
    let ledger = Arc::new(FakeLedger::new());
    let fhe = Arc::new(FakeFhe::new());
    let controller = build_controller(ledger.clone(), fhe.clone(), fhe.clone());
    ledger.seed(
        "tryon-1",
        super::support::record("Office", 60, 0),
        ethers::types::H256::repeat_byte(1),
    );
    controller.refresh_sessions().await;
    let session = controller.session("tryon-1").await.unwrap();

    let result = controller.reveal_session(&session).await;

    assert_eq!(result, Err(SessionError::NotAuthenticated));
    assert_eq!(fhe.calls(), 0);
}

#[tokio::test]
async fn test_conceal_only_hides_local_values() {
    let h = Harness::new();
    h.ledger.lagging_reads.store(true, Ordering::SeqCst);
    h.seed_sealed("tryon-1", "Office", 60, 170);
    h.seed_verified("tryon-2", "Party", 55, 162);
    h.controller.refresh_sessions().await;

    let session = h.controller.session("tryon-1").await.unwrap();
    h.controller.reveal_session(&session).await.unwrap();

    assert!(h.controller.conceal_session("tryon-1").await);
    assert_eq!(
        h.controller.session("tryon-1").await.unwrap().verification,
        ConfidentialValueState::Sealed
    );
    assert!(!h.controller.conceal_session("tryon-1").await);
    assert!(!h.controller.conceal_session("tryon-2").await);
    assert!(!h.controller.conceal_session("missing").await);
}

#[tokio::test]
async fn test_analysis_uses_revealed_height() {
    let h = Harness::new();
    h.seed_sealed("tryon-1", "Office", 70, 181);
    h.controller.refresh_sessions().await;

    assert_eq!(
        h.controller.analyze("tryon-1").await,
        Some(FitAnalysis::analyze(170, 70))
    );

    let session = h.controller.session("tryon-1").await.unwrap();
    h.controller.reveal_session(&session).await.unwrap();

    assert_eq!(
        h.controller.analyze("tryon-1").await,
        Some(FitAnalysis::analyze(181, 70))
    );
}
