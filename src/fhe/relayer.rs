// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP relayer client for the confidential-compute service
//!
//! The relayer owns the keys and the proof systems. This client only moves
//! JSON: plaintext in for `/v1/encrypt`, handles in for `/v1/public-decrypt`.

use async_trait::async_trait;
use ethers::types::{Address, Bytes, H256};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use super::{
    DecryptionOutcome, DecryptionVerifier, EncryptedInput, EncryptionGateway, GatewayError,
    ProofSubmission, VerifierError,
};
use crate::sessions::types::CiphertextHandle;

const ENCRYPTED_VALUE_TYPE: &str = "euint32";

#[derive(Debug, Clone)]
pub struct RelayerConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for RelayerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

// --- Relayer wire structs ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EncryptRequest {
    contract_address: String,
    user_address: String,
    values: Vec<TypedValue>,
}

#[derive(Serialize)]
struct TypedValue {
    #[serde(rename = "type")]
    kind: String,
    value: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EncryptResponse {
    handles: Vec<String>,
    input_proof: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PublicDecryptRequest {
    handles: Vec<String>,
    contract_address: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublicDecryptResponse {
    clear_values: HashMap<String, String>,
    abi_encoded_clear_values: String,
    decryption_proof: String,
}

pub struct RelayerClient {
    client: Client,
    base_url: Url,
}

impl RelayerClient {
    pub fn new(config: RelayerConfig) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        // Trailing slash so `join` appends below any base path
        let base_url = Url::parse(&format!("{}/", config.base_url.trim_end_matches('/')))?;
        info!("Relayer client configured: {}", base_url);

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        self.base_url.join(path)
    }

    async fn post<Req: Serialize, Resp: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &Req,
    ) -> Result<Resp, String> {
        let url = self.endpoint(path).map_err(|e| e.to_string())?;
        debug!("POST {}", url);

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(format!("relayer returned {}: {}", status, detail));
        }

        response.json::<Resp>().await.map_err(|e| e.to_string())
    }
}

fn decode_hex(value: &str) -> Result<Vec<u8>, hex::FromHexError> {
    hex::decode(value.trim_start_matches("0x"))
}

fn decode_handle(value: &str) -> Result<CiphertextHandle, String> {
    let bytes = decode_hex(value).map_err(|e| format!("handle {}: {}", value, e))?;
    if bytes.len() != 32 {
        return Err(format!("handle {} is {} bytes, expected 32", value, bytes.len()));
    }
    Ok(H256::from_slice(&bytes))
}

fn encode_handle(handle: &CiphertextHandle) -> String {
    format!("0x{}", hex::encode(handle.as_bytes()))
}

fn address_hex(address: Address) -> String {
    format!("0x{}", hex::encode(address.as_bytes()))
}

#[async_trait]
impl EncryptionGateway for RelayerClient {
    async fn encrypt(
        &self,
        contract: Address,
        account: Address,
        value: u32,
    ) -> Result<EncryptedInput, GatewayError> {
        let request = EncryptRequest {
            contract_address: address_hex(contract),
            user_address: address_hex(account),
            values: vec![TypedValue {
                kind: ENCRYPTED_VALUE_TYPE.to_string(),
                value: value as u64,
            }],
        };

        let response: EncryptResponse = self
            .post("v1/encrypt", &request)
            .await
            .map_err(GatewayError::Unavailable)?;

        let handle = response
            .handles
            .first()
            .ok_or_else(|| GatewayError::InvalidResponse("no handle returned".to_string()))
            .and_then(|h| decode_handle(h).map_err(GatewayError::InvalidResponse))?;
        let proof = decode_hex(&response.input_proof)
            .map_err(|e| GatewayError::InvalidResponse(format!("input proof: {}", e)))?;

        Ok(EncryptedInput {
            handle,
            proof: Bytes::from(proof),
        })
    }
}

#[async_trait]
impl DecryptionVerifier for RelayerClient {
    async fn verify(
        &self,
        handles: &[CiphertextHandle],
        contract: Address,
        on_proof_ready: ProofSubmission,
    ) -> Result<DecryptionOutcome, VerifierError> {
        let request = PublicDecryptRequest {
            handles: handles.iter().map(encode_handle).collect(),
            contract_address: address_hex(contract),
        };

        let response: PublicDecryptResponse = self
            .post("v1/public-decrypt", &request)
            .await
            .map_err(VerifierError::Decryption)?;

        let mut clear_values = HashMap::with_capacity(response.clear_values.len());
        for (handle, value) in &response.clear_values {
            let handle = decode_handle(handle).map_err(VerifierError::InvalidResponse)?;
            let value = value.parse::<u64>().map_err(|e| {
                VerifierError::InvalidResponse(format!("clear value {}: {}", value, e))
            })?;
            clear_values.insert(handle, value);
        }

        let abi_encoded_clear_values = Bytes::from(
            decode_hex(&response.abi_encoded_clear_values)
                .map_err(|e| VerifierError::InvalidResponse(format!("clear values: {}", e)))?,
        );
        let proof = Bytes::from(
            decode_hex(&response.decryption_proof)
                .map_err(|e| VerifierError::InvalidResponse(format!("decryption proof: {}", e)))?,
        );

        on_proof_ready
            .submit(abi_encoded_clear_values.clone(), proof.clone())
            .await
            .map_err(VerifierError::Submission)?;

        Ok(DecryptionOutcome {
            clear_values,
            abi_encoded_clear_values,
            proof,
        })
    }
}
