// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Confidential-compute collaborators
//!
//! The encryption scheme, key management and proof systems live outside this
//! crate. The session lifecycle only talks to them through two traits:
//!
//! - [`EncryptionGateway`] turns a plaintext into a ciphertext handle plus
//!   input proof, bound to a contract address and the submitting account.
//! - [`DecryptionVerifier`] turns ciphertext handles into clear values plus a
//!   decryption proof, and hands that proof to a [`ProofSubmission`] so it can
//!   be validated on-chain before the clear values are returned.
//!
//! [`relayer::RelayerClient`] implements both over HTTP.

pub mod relayer;

use async_trait::async_trait;
use ethers::types::{Address, Bytes, TransactionReceipt};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;

use crate::contracts::ledger::LedgerError;
use crate::sessions::types::CiphertextHandle;

pub use relayer::{RelayerClient, RelayerConfig};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("Encryption service unavailable: {0}")]
    Unavailable(String),

    #[error("Encryption rejected: {0}")]
    Rejected(String),

    #[error("Invalid encryption response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifierError {
    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("Invalid decryption response: {0}")]
    InvalidResponse(String),

    /// The on-chain half of the reveal failed
    #[error("Proof submission failed: {0}")]
    Submission(LedgerError),
}

/// Ciphertext and input proof for one encrypted value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedInput {
    pub handle: CiphertextHandle,
    pub proof: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DecryptionOutcome {
    pub clear_values: HashMap<CiphertextHandle, u64>,
    pub abi_encoded_clear_values: Bytes,
    pub proof: Bytes,
}

#[async_trait]
pub trait EncryptionGateway: Send + Sync {
    async fn encrypt(
        &self,
        contract: Address,
        account: Address,
        value: u32,
    ) -> Result<EncryptedInput, GatewayError>;
}

#[async_trait]
pub trait DecryptionVerifier: Send + Sync {
    /// Decrypt `handles`, then pass the clear-value blob and its proof to
    /// `on_proof_ready`. Implementations must consume `on_proof_ready` before
    /// returning `Ok`, and must return `VerifierError::Submission` when it fails.
    async fn verify(
        &self,
        handles: &[CiphertextHandle],
        contract: Address,
        on_proof_ready: ProofSubmission,
    ) -> Result<DecryptionOutcome, VerifierError>;
}

type SubmitFn = Box<
    dyn FnOnce(Bytes, Bytes) -> BoxFuture<'static, Result<TransactionReceipt, LedgerError>>
        + Send,
>;

/// One-shot continuation that submits a decryption proof on-chain.
///
/// `submit` takes `self`, so a verifier can call it at most once.
pub struct ProofSubmission {
    submit: SubmitFn,
}

impl ProofSubmission {
    pub fn new<F, Fut>(submit: F) -> Self
    where
        F: FnOnce(Bytes, Bytes) -> Fut + Send + 'static,
        Fut: Future<Output = Result<TransactionReceipt, LedgerError>> + Send + 'static,
    {
        Self {
            submit: Box::new(move |clear_values, proof| Box::pin(submit(clear_values, proof))),
        }
    }

    pub async fn submit(
        self,
        clear_values: Bytes,
        proof: Bytes,
    ) -> Result<TransactionReceipt, LedgerError> {
        (self.submit)(clear_values, proof).await
    }
}

impl fmt::Debug for ProofSubmission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProofSubmission").finish_non_exhaustive()
    }
}
