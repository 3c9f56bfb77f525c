// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Session data model
//!
//! A [`Session`] is immutable once created except for its
//! [`ConfidentialValueState`], which only ever moves forward:
//!
//! ```text
//! Sealed ──► LocallyRevealed ──► OnChainVerified
//!    └──────────────────────────────────┘
//! ```
//!
//! `LocallyRevealed` is the only state a client may clear on its own
//! (back to `Sealed`). `OnChainVerified` is permanent and its value never
//! changes once observed.

use ethers::types::{Address, H256};
use serde::{Deserialize, Serialize};

/// Opaque reference to a stored ciphertext (an FHE handle, `bytes32` on-chain)
pub type CiphertextHandle = H256;

/// Clothing type used when the caller does not supply one
pub const DEFAULT_CLOTHING_TYPE: &str = "dress";

/// Prefix of the descriptive tag written alongside every new session
pub const TAG_PREFIX: &str = "Virtual Try-On";

/// What this client knows about the protected (height) field of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value")]
pub enum ConfidentialValueState {
    /// No clear value known to this client
    Sealed,
    /// Clear value obtained through a reveal, not yet recorded by the ledger
    LocallyRevealed(u32),
    /// Clear value recorded as verified by the ledger
    OnChainVerified(u32),
}

impl Default for ConfidentialValueState {
    fn default() -> Self {
        ConfidentialValueState::Sealed
    }
}

impl ConfidentialValueState {
    /// Merge a newly observed state into the current one.
    ///
    /// `OnChainVerified` dominates everything and keeps the first value
    /// observed; a `LocallyRevealed` cache survives an unverified ledger read.
    pub fn reconcile(self, observed: ConfidentialValueState) -> ConfidentialValueState {
        use ConfidentialValueState::*;

        match (self, observed) {
            (OnChainVerified(v), _) => OnChainVerified(v),
            (_, OnChainVerified(v)) => OnChainVerified(v),
            (_, LocallyRevealed(v)) => LocallyRevealed(v),
            (LocallyRevealed(v), Sealed) => LocallyRevealed(v),
            (Sealed, Sealed) => Sealed,
        }
    }

    /// Drop a locally revealed value. Other states are left untouched.
    pub fn conceal(self) -> ConfidentialValueState {
        match self {
            ConfidentialValueState::LocallyRevealed(_) => ConfidentialValueState::Sealed,
            other => other,
        }
    }

    /// The dominant clear value, preferring the on-chain one
    pub fn clear_value(&self) -> Option<u32> {
        match self {
            ConfidentialValueState::Sealed => None,
            ConfidentialValueState::LocallyRevealed(v) => Some(*v),
            ConfidentialValueState::OnChainVerified(v) => Some(*v),
        }
    }

    pub fn is_verified(&self) -> bool {
        matches!(self, ConfidentialValueState::OnChainVerified(_))
    }

    pub fn is_revealed_locally(&self) -> bool {
        matches!(self, ConfidentialValueState::LocallyRevealed(_))
    }

    /// Short label for display, e.g. in the CLI listing
    pub fn describe(&self) -> String {
        match self {
            ConfidentialValueState::Sealed => "sealed".to_string(),
            ConfidentialValueState::LocallyRevealed(v) => format!("{}cm (locally decrypted)", v),
            ConfidentialValueState::OnChainVerified(v) => format!("{}cm (on-chain verified)", v),
        }
    }
}

/// A try-on session as seen by this client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub label: String,
    /// Creation time in unix seconds
    pub created_at: u64,
    pub owner: Address,
    /// Plaintext weight, disclosed without protection
    pub public_field: u32,
    pub accessor_hint: u32,
    pub tag: String,
    /// Ledger reference to the encrypted height; learned lazily on reveal
    pub confidential_handle: Option<CiphertextHandle>,
    pub verification: ConfidentialValueState,
}

impl Session {
    pub fn from_record(id: impl Into<String>, record: SessionRecord) -> Self {
        let verification = if record.is_verified {
            ConfidentialValueState::OnChainVerified(record.verified_value)
        } else {
            ConfidentialValueState::Sealed
        };

        Self {
            id: id.into(),
            label: record.label,
            created_at: record.created_at,
            owner: record.owner,
            public_field: record.public_field,
            accessor_hint: record.accessor_hint,
            tag: record.tag,
            confidential_handle: None,
            verification,
        }
    }
}

/// Ledger view of a session, as returned by `getBusinessData`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub label: String,
    pub created_at: u64,
    pub owner: Address,
    pub public_field: u32,
    pub accessor_hint: u32,
    pub tag: String,
    pub is_verified: bool,
    pub verified_value: u32,
}

/// Input of the create path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    pub label: String,
    pub public_field: u32,
    /// Height to encrypt; never leaves the process in clear
    pub secret_height: u32,
    pub clothing_type: String,
}

impl NewSession {
    pub fn new(label: impl Into<String>, public_field: u32, secret_height: u32) -> Self {
        Self {
            label: label.into(),
            public_field,
            secret_height,
            clothing_type: DEFAULT_CLOTHING_TYPE.to_string(),
        }
    }

    pub fn with_clothing_type(mut self, clothing_type: impl Into<String>) -> Self {
        self.clothing_type = clothing_type.into();
        self
    }

    pub fn tag(&self) -> String {
        format!("{}: {}", TAG_PREFIX, self.clothing_type)
    }
}
