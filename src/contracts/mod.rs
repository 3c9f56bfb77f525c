// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod client;
pub mod ledger;
pub mod types;

pub use client::{SignerClient, Web3Client, Web3Config};
pub use ledger::{CreateSessionCall, EthersLedgerStore, LedgerConfig, LedgerError, LedgerStore};
pub use types::TryOnRegistry;
