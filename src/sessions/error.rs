// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use crate::contracts::ledger::LedgerError;
use crate::fhe::{GatewayError, VerifierError};

/// Failures surfaced by the session lifecycle controller
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("No wallet connected")]
    NotAuthenticated,

    #[error("Transaction rejected by user")]
    UserRejected,

    #[error("Submission failed: {0}")]
    SubmissionFailed(String),

    #[error("Decryption failed: {0}")]
    VerificationFailed(String),

    /// Another party verified the session first. Reveal treats this as success.
    #[error("Data is already verified on-chain")]
    AlreadyVerified,
}

impl SessionError {
    /// Message shown through the transaction status slot
    pub fn status_message(&self) -> String {
        match self {
            SessionError::NotAuthenticated => "Please connect wallet first".to_string(),
            other => other.to_string(),
        }
    }

    /// Whether the caller may reasonably retry the same operation by hand
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SessionError::SubmissionFailed(_) | SessionError::VerificationFailed(_)
        )
    }

    /// Classify a failed create-path ledger write
    pub fn from_submission(err: LedgerError) -> Self {
        match err {
            LedgerError::Rejected => SessionError::UserRejected,
            other => SessionError::SubmissionFailed(other.to_string()),
        }
    }

    pub fn from_encryption(err: GatewayError) -> Self {
        SessionError::SubmissionFailed(err.to_string())
    }

    /// Classify a failed reveal. The "already verified" race is kept distinct.
    pub fn from_verification(err: VerifierError) -> Self {
        match err {
            VerifierError::Submission(LedgerError::AlreadyVerified) => {
                SessionError::AlreadyVerified
            }
            other => SessionError::VerificationFailed(other.to_string()),
        }
    }
}
