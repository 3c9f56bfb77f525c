// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Refresh tests: partial failures, merge rules and dashboard helpers

use super::support::Harness;
use confidential_tryon::sessions::{ConfidentialValueState, TransactionState};
use std::sync::Arc;
use tokio::sync::Notify;

#[tokio::test]
async fn test_one_failed_read_still_returns_the_other_two() {
    let h = Harness::new();
    h.seed_sealed("tryon-1", "Office", 60, 170);
    h.seed_sealed("tryon-2", "Party", 55, 162);
    h.seed_sealed("tryon-3", "Beach", 70, 181);
    h.ledger.make_unreadable("tryon-2");

    let sessions = h.controller.refresh_sessions().await;

    let ids: Vec<_> = sessions.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["tryon-1", "tryon-3"]);
    assert!(!matches!(
        h.controller.transaction_state(),
        TransactionState::Failed(_)
    ));
}

#[tokio::test]
async fn test_all_reads_failing_reports_load_failure() {
    let h = Harness::new();
    h.seed_sealed("tryon-1", "Office", 60, 170);
    h.ledger.make_unreadable("tryon-1");

    let sessions = h.controller.refresh_sessions().await;

    assert!(sessions.is_empty());
    assert_eq!(
        h.controller.transaction_state(),
        TransactionState::Failed("Failed to load data".to_string())
    );
}

#[tokio::test]
async fn test_listing_failure_keeps_current_list() {
    let h = Harness::new();
    h.seed_sealed("tryon-1", "Office", 60, 170);
    let loaded = h.controller.refresh_sessions().await;

    h.ledger.list_fails.store(true, std::sync::atomic::Ordering::SeqCst);
    let after = h.controller.refresh_sessions().await;

    assert_eq!(after, loaded);
    assert_eq!(
        h.controller.transaction_state(),
        TransactionState::Failed("Failed to load data".to_string())
    );
}

#[tokio::test]
async fn test_verified_state_is_read_from_ledger() {
    let h = Harness::new();
    h.seed_verified("tryon-1", "Office", 60, 172);

    let sessions = h.controller.refresh_sessions().await;

    assert_eq!(
        sessions[0].verification,
        ConfidentialValueState::OnChainVerified(172)
    );
}

#[tokio::test]
async fn test_refresh_never_demotes_verified_session() {
    let h = Harness::new();
    h.seed_verified("tryon-1", "Office", 60, 172);
    h.controller.refresh_sessions().await;

    h.ledger.clear_verification("tryon-1");
    h.controller.refresh_sessions().await;
    h.ledger.mark_verified("tryon-1", 999);
    h.controller.refresh_sessions().await;

    assert_eq!(
        h.controller.session("tryon-1").await.unwrap().verification,
        ConfidentialValueState::OnChainVerified(172)
    );
}

#[tokio::test]
async fn test_unreadable_session_keeps_previous_copy() {
    let h = Harness::new();
    h.seed_verified("tryon-1", "Office", 60, 172);
    h.seed_sealed("tryon-2", "Party", 55, 162);
    h.controller.refresh_sessions().await;

    h.ledger.make_unreadable("tryon-1");
    let sessions = h.controller.refresh_sessions().await;

    assert_eq!(sessions.len(), 2);
    assert_eq!(
        h.controller.session("tryon-1").await.unwrap().verification,
        ConfidentialValueState::OnChainVerified(172)
    );
}

#[tokio::test]
async fn test_summary_and_search_over_refreshed_list() {
    let h = Harness::new();
    h.seed_verified("tryon-1", "Office Dress", 60, 172);
    h.seed_sealed("tryon-2", "Party dress", 50, 162);
    h.seed_sealed("tryon-3", "Beach", 70, 181);
    h.controller.refresh_sessions().await;

    let summary = h.controller.summary(1_700_000_000 + 60).await;
    assert_eq!(summary.total, 3);
    assert_eq!(summary.verified, 1);
    assert_eq!(summary.recent, 3);
    assert!((summary.average_public_field - 60.0).abs() < f64::EPSILON);

    let dresses = h.controller.search("DRESS").await;
    assert_eq!(dresses.len(), 2);
    assert_eq!(h.controller.search("").await.len(), 3);
}

#[tokio::test]
async fn test_older_refresh_finishing_last_is_discarded() {
    let h = Harness::new();
    h.seed_sealed("tryon-1", "Office", 60, 172);
    h.controller.refresh_sessions().await;

    let gate = Arc::new(Notify::new());
    h.ledger.gate_next_read(gate.clone());

    let (older, newer) = tokio::join!(h.controller.refresh_sessions(), async {
        h.ledger.mark_verified("tryon-1", 172);
        h.ledger.relabel("tryon-1", "Office (edited)");
        let newer = h.controller.refresh_sessions().await;
        gate.notify_one();
        newer
    });

    assert_eq!(newer[0].label, "Office (edited)");
    assert_eq!(older, newer);

    let session = h.controller.session("tryon-1").await.unwrap();
    assert_eq!(session.label, "Office (edited)");
    assert_eq!(
        session.verification,
        ConfidentialValueState::OnChainVerified(172)
    );
}
