// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod cli;
pub mod config;
pub mod contracts;
pub mod fhe;
pub mod sessions;

// Re-export main types
pub use config::TryOnConfig;
pub use contracts::{EthersLedgerStore, LedgerError, LedgerStore, Web3Client, Web3Config};
pub use fhe::{
    DecryptionOutcome, DecryptionVerifier, EncryptedInput, EncryptionGateway, GatewayError,
    ProofSubmission, RelayerClient, RelayerConfig, VerifierError,
};
pub use sessions::{
    ConfidentialValueState, ControllerConfig, FitAnalysis, NewSession, Session, SessionError,
    SessionLifecycleController, SessionRecord, SessionSummary, TransactionState,
};
