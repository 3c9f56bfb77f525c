// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Ledger read/write contract
//!
//! [`LedgerStore`] is the seam between the session lifecycle and the
//! on-chain registry. [`EthersLedgerStore`] implements it on top of the
//! `TryOnRegistry` binding; tests substitute in-memory stores.
//!
//! Write calls resolve only once the transaction is mined with the configured
//! number of confirmations and a successful status.

use async_trait::async_trait;
use ethers::abi::Detokenize;
use ethers::contract::{ContractCall, ContractError};
use ethers::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::types::{TryOnRegistry, ALREADY_VERIFIED_REASON};
use crate::sessions::types::{CiphertextHandle, SessionRecord};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Transaction rejected by signer")]
    Rejected,

    #[error("Data already verified")]
    AlreadyVerified,

    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Transaction reverted: {0}")]
    Reverted(String),

    #[error("Unexpected ledger data: {0}")]
    Decode(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Timed out waiting for confirmation")]
    Timeout,

    #[error("Transaction dropped from mempool")]
    Dropped,
}

impl LedgerError {
    /// Classify a decoded revert reason
    pub fn from_revert_reason(reason: &str) -> Self {
        if is_already_verified(reason) {
            LedgerError::AlreadyVerified
        } else {
            LedgerError::Reverted(reason.to_string())
        }
    }

    /// Classify an error that only carries a message (RPC, wallet, transport)
    pub fn from_message(message: &str) -> Self {
        let lower = message.to_lowercase();
        if is_already_verified(message) {
            LedgerError::AlreadyVerified
        } else if lower.contains("user rejected") || lower.contains("user denied") {
            LedgerError::Rejected
        } else if lower.contains("execution reverted") {
            LedgerError::Reverted(message.to_string())
        } else {
            LedgerError::Transport(message.to_string())
        }
    }
}

fn is_already_verified(message: &str) -> bool {
    message
        .to_lowercase()
        .contains(&ALREADY_VERIFIED_REASON.to_lowercase())
}

/// Arguments of the `createBusinessData` write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSessionCall {
    pub id: String,
    pub label: String,
    pub ciphertext: CiphertextHandle,
    pub proof: Bytes,
    pub public_field: u32,
    pub accessor_hint: u32,
    pub tag: String,
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn list_session_ids(&self) -> Result<Vec<String>, LedgerError>;

    async fn get_session(&self, id: &str) -> Result<SessionRecord, LedgerError>;

    async fn get_confidential_handle(&self, id: &str) -> Result<CiphertextHandle, LedgerError>;

    async fn is_system_available(&self) -> Result<bool, LedgerError>;

    async fn create_session(&self, call: CreateSessionCall)
        -> Result<TransactionReceipt, LedgerError>;

    /// Fails with [`LedgerError::AlreadyVerified`] when another party already
    /// completed verification for `id`.
    async fn submit_decryption_proof(
        &self,
        id: &str,
        clear_values: Bytes,
        proof: Bytes,
    ) -> Result<TransactionReceipt, LedgerError>;
}

#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub contract_address: Address,
    pub confirmations: usize,
    pub tx_timeout: Duration,
}

/// `LedgerStore` backed by the deployed registry. Use a `SignerMiddleware`
/// for `M` to enable the write path; a bare provider is read-only.
pub struct EthersLedgerStore<M: Middleware> {
    contract: TryOnRegistry<M>,
    config: LedgerConfig,
}

impl<M: Middleware + 'static> EthersLedgerStore<M> {
    pub fn new(client: Arc<M>, config: LedgerConfig) -> Self {
        let contract = TryOnRegistry::new(config.contract_address, client);
        info!(
            "Ledger store bound to registry {:?} ({} confirmation(s))",
            config.contract_address, config.confirmations
        );
        Self { contract, config }
    }

    async fn send_and_confirm<D: Detokenize>(
        &self,
        call: ContractCall<M, D>,
        operation: &str,
    ) -> Result<TransactionReceipt, LedgerError> {
        let pending = call.send().await.map_err(classify_contract_error)?;
        let tx_hash = pending.tx_hash();
        info!("{} submitted: {:?}", operation, tx_hash);

        let receipt = tokio::time::timeout(
            self.config.tx_timeout,
            pending.confirmations(self.config.confirmations),
        )
        .await
        .map_err(|_| {
            error!(
                "Timed out after {:?} waiting for {} ({:?})",
                self.config.tx_timeout, operation, tx_hash
            );
            LedgerError::Timeout
        })?
        .map_err(|e| LedgerError::from_message(&e.to_string()))?
        .ok_or(LedgerError::Dropped)?;

        if receipt.status != Some(U64::from(1)) {
            error!("{} failed on-chain: {:?}", operation, tx_hash);
            return Err(LedgerError::Reverted(format!(
                "{} reverted in {:?}",
                operation, tx_hash
            )));
        }

        info!(
            "{} confirmed in block {:?}",
            operation, receipt.block_number
        );
        Ok(receipt)
    }
}

fn classify_contract_error<M: Middleware>(err: ContractError<M>) -> LedgerError {
    if let Some(reason) = err.decode_revert::<String>() {
        return LedgerError::from_revert_reason(&reason);
    }
    LedgerError::from_message(&err.to_string())
}

fn to_u32(value: U256, field: &str) -> Result<u32, LedgerError> {
    u32::try_from(value)
        .map_err(|_| LedgerError::Decode(format!("{} out of range: {}", field, value)))
}

/// A proof transaction that reverted against a session which now reads as
/// verified lost the race to another submitter.
fn reclassify_reverted_proof(detail: String, verified_now: bool) -> LedgerError {
    if verified_now {
        LedgerError::AlreadyVerified
    } else {
        LedgerError::Reverted(detail)
    }
}

#[async_trait]
impl<M: Middleware + 'static> LedgerStore for EthersLedgerStore<M> {
    async fn list_session_ids(&self) -> Result<Vec<String>, LedgerError> {
        let ids = self
            .contract
            .get_all_business_ids()
            .call()
            .await
            .map_err(classify_contract_error)?;
        debug!("Ledger lists {} session(s)", ids.len());
        Ok(ids)
    }

    async fn get_session(&self, id: &str) -> Result<SessionRecord, LedgerError> {
        let (label, value_1, value_2, tag, creator, timestamp, is_verified, decrypted) = self
            .contract
            .get_business_data(id.to_string())
            .call()
            .await
            .map_err(classify_contract_error)?;

        if creator.is_zero() {
            return Err(LedgerError::NotFound(id.to_string()));
        }

        Ok(SessionRecord {
            label,
            created_at: u64::try_from(timestamp).map_err(|_| {
                LedgerError::Decode(format!("timestamp out of range: {}", timestamp))
            })?,
            owner: creator,
            public_field: to_u32(value_1, "publicValue1")?,
            accessor_hint: to_u32(value_2, "publicValue2")?,
            tag,
            is_verified,
            verified_value: decrypted,
        })
    }

    async fn get_confidential_handle(&self, id: &str) -> Result<CiphertextHandle, LedgerError> {
        let handle = self
            .contract
            .get_encrypted_value(id.to_string())
            .call()
            .await
            .map_err(classify_contract_error)?;
        Ok(H256::from(handle))
    }

    async fn is_system_available(&self) -> Result<bool, LedgerError> {
        self.contract
            .is_available()
            .call()
            .await
            .map_err(classify_contract_error)
    }

    async fn create_session(
        &self,
        call: CreateSessionCall,
    ) -> Result<TransactionReceipt, LedgerError> {
        info!("Creating session {} on-chain", call.id);
        let tx = self.contract.create_business_data(
            call.id,
            call.label,
            call.ciphertext.to_fixed_bytes(),
            call.proof,
            U256::from(call.public_field),
            U256::from(call.accessor_hint),
            call.tag,
        );
        self.send_and_confirm(tx, "createBusinessData").await
    }

    async fn submit_decryption_proof(
        &self,
        id: &str,
        clear_values: Bytes,
        proof: Bytes,
    ) -> Result<TransactionReceipt, LedgerError> {
        info!("Submitting decryption proof for session {}", id);
        let tx = self
            .contract
            .verify_decryption(id.to_string(), clear_values, proof);

        match self.send_and_confirm(tx, "verifyDecryption").await {
            // A mined revert carries no reason; check whether another proof landed first
            Err(LedgerError::Reverted(detail)) => {
                let verified_now = match self.get_session(id).await {
                    Ok(record) => record.is_verified,
                    Err(e) => {
                        warn!("Could not re-read session {} after revert: {}", id, e);
                        false
                    }
                };
                if verified_now {
                    info!("Session {} was verified by another transaction", id);
                }
                Err(reclassify_reverted_proof(detail, verified_now))
            }
            other => other,
        }
    }
}
