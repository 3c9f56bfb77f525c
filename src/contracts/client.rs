// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use ethers::prelude::*;
use ethers::providers::{Http, Provider};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub type SignerClient = SignerMiddleware<Arc<Provider<Http>>, LocalWallet>;

#[derive(Debug, Clone)]
pub struct Web3Config {
    pub rpc_url: String,
    pub chain_id: u64,
    pub polling_interval: Duration,
    pub private_key: Option<String>,
}

impl Default for Web3Config {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".to_string(),
            chain_id: 11155111,
            polling_interval: Duration::from_millis(500),
            private_key: None,
        }
    }
}

/// Provider plus optional signer. Without a private key the client can only
/// read, and the session controller stays unauthenticated.
pub struct Web3Client {
    pub provider: Arc<Provider<Http>>,
    signer: Option<Arc<SignerClient>>,
}

impl Web3Client {
    pub async fn new(config: Web3Config) -> Result<Self> {
        let provider = Provider::<Http>::try_from(&config.rpc_url)
            .map_err(|e| anyhow!("Failed to create provider: {}", e))?
            .interval(config.polling_interval);

        // Verify connection
        let chain_id = provider
            .get_chainid()
            .await
            .map_err(|e| anyhow!("Failed to connect to RPC: {}", e))?;

        if chain_id.as_u64() != config.chain_id {
            return Err(anyhow!(
                "Chain ID mismatch: expected {}, got {}",
                config.chain_id,
                chain_id
            ));
        }

        let provider = Arc::new(provider);

        let signer = match &config.private_key {
            Some(private_key) => {
                let wallet = private_key
                    .parse::<LocalWallet>()
                    .map_err(|e| anyhow!("Invalid private key: {}", e))?
                    .with_chain_id(config.chain_id);
                info!("Signer configured for account {:?}", wallet.address());
                Some(Arc::new(SignerMiddleware::new(provider.clone(), wallet)))
            }
            None => {
                info!("No private key configured, running read-only");
                None
            }
        };

        Ok(Self { provider, signer })
    }

    pub fn signer(&self) -> Option<Arc<SignerClient>> {
        self.signer.clone()
    }

    /// Account that signs writes, if any
    pub fn account(&self) -> Option<Address> {
        self.signer.as_ref().map(|s| s.address())
    }
}
