// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Runtime configuration
//!
//! Values come from the process environment (after `.env` is loaded), then an
//! optional TOML file with a `[tryon]` table, then built-in defaults.

use anyhow::{anyhow, Context, Result};
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::contracts::{LedgerConfig, Web3Config};
use crate::fhe::RelayerConfig;
use crate::sessions::ControllerConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TryOnConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    pub contract_address: Option<Address>,
    pub private_key: Option<String>,
    pub relayer_url: String,
    pub confirmations: usize,
    pub tx_timeout_secs: u64,
    pub success_display_ms: u64,
    pub failure_display_ms: u64,
}

impl Default for TryOnConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".to_string(),
            chain_id: 11155111,
            contract_address: None,
            private_key: None,
            relayer_url: "http://localhost:3000".to_string(),
            confirmations: 1,
            tx_timeout_secs: 120,
            success_display_ms: 2000,
            failure_display_ms: 3000,
        }
    }
}

impl TryOnConfig {
    /// Load from an optional TOML file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv::dotenv().ok();

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_value: toml::Value = toml::from_str(&content)?;

        match toml_value.get("tryon") {
            Some(table) => Ok(table.clone().try_into()?),
            None => Ok(Self::default()),
        }
    }

    /// Apply `TRYON_*` overrides from `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("TRYON_RPC_URL") {
            self.rpc_url = val;
        }
        if let Some(val) = lookup("TRYON_CHAIN_ID") {
            self.chain_id = val
                .parse()
                .map_err(|e| anyhow!("Invalid TRYON_CHAIN_ID {}: {}", val, e))?;
        }
        if let Some(val) = lookup("TRYON_CONTRACT_ADDRESS") {
            self.contract_address = Some(
                val.parse()
                    .map_err(|e| anyhow!("Invalid TRYON_CONTRACT_ADDRESS {}: {}", val, e))?,
            );
        }
        if let Some(val) = lookup("TRYON_PRIVATE_KEY") {
            if !val.is_empty() {
                self.private_key = Some(val);
            }
        }
        if let Some(val) = lookup("TRYON_RELAYER_URL") {
            self.relayer_url = val;
        }
        if let Some(val) = lookup("TRYON_CONFIRMATIONS") {
            if let Ok(num) = val.parse() {
                self.confirmations = num;
            }
        }
        if let Some(val) = lookup("TRYON_TX_TIMEOUT_SECS") {
            if let Ok(num) = val.parse() {
                self.tx_timeout_secs = num;
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.contract_address.is_none() {
            return Err(anyhow!(
                "TRYON_CONTRACT_ADDRESS must be set (env or [tryon].contract_address)"
            ));
        }
        if self.confirmations == 0 {
            return Err(anyhow!("confirmations must be at least 1"));
        }
        Ok(())
    }

    pub fn contract(&self) -> Result<Address> {
        self.contract_address
            .ok_or_else(|| anyhow!("No registry contract address configured"))
    }

    pub fn web3_config(&self) -> Web3Config {
        Web3Config {
            rpc_url: self.rpc_url.clone(),
            chain_id: self.chain_id,
            private_key: self.private_key.clone(),
            ..Web3Config::default()
        }
    }

    pub fn ledger_config(&self) -> Result<LedgerConfig> {
        Ok(LedgerConfig {
            contract_address: self.contract()?,
            confirmations: self.confirmations,
            tx_timeout: Duration::from_secs(self.tx_timeout_secs),
        })
    }

    pub fn relayer_config(&self) -> RelayerConfig {
        RelayerConfig {
            base_url: self.relayer_url.clone(),
            ..RelayerConfig::default()
        }
    }

    pub fn controller_config(&self) -> Result<ControllerConfig> {
        Ok(ControllerConfig {
            contract_address: self.contract()?,
            success_display: Duration::from_millis(self.success_display_ms),
            failure_display: Duration::from_millis(self.failure_display_ms),
        })
    }
}
