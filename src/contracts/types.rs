// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use ethers::prelude::*;

// Confidential try-on registry. `externalEuint32` inputs travel as `bytes32`
// handles; the stored ciphertext handle comes back from `getEncryptedValue`.
abigen!(
    TryOnRegistry,
    r#"[
        {
            "inputs": [],
            "name": "getAllBusinessIds",
            "outputs": [{"internalType": "string[]", "name": "", "type": "string[]"}],
            "stateMutability": "view",
            "type": "function"
        },
        {
            "inputs": [{"internalType": "string", "name": "businessId", "type": "string"}],
            "name": "getBusinessData",
            "outputs": [
                {"internalType": "string", "name": "name", "type": "string"},
                {"internalType": "uint256", "name": "publicValue1", "type": "uint256"},
                {"internalType": "uint256", "name": "publicValue2", "type": "uint256"},
                {"internalType": "string", "name": "description", "type": "string"},
                {"internalType": "address", "name": "creator", "type": "address"},
                {"internalType": "uint256", "name": "timestamp", "type": "uint256"},
                {"internalType": "bool", "name": "isVerified", "type": "bool"},
                {"internalType": "uint32", "name": "decryptedValue", "type": "uint32"}
            ],
            "stateMutability": "view",
            "type": "function"
        },
        {
            "inputs": [{"internalType": "string", "name": "businessId", "type": "string"}],
            "name": "getEncryptedValue",
            "outputs": [{"internalType": "bytes32", "name": "", "type": "bytes32"}],
            "stateMutability": "view",
            "type": "function"
        },
        {
            "inputs": [],
            "name": "isAvailable",
            "outputs": [{"internalType": "bool", "name": "", "type": "bool"}],
            "stateMutability": "view",
            "type": "function"
        },
        {
            "inputs": [
                {"internalType": "string", "name": "businessId", "type": "string"},
                {"internalType": "string", "name": "name", "type": "string"},
                {"internalType": "bytes32", "name": "encryptedValue", "type": "bytes32"},
                {"internalType": "bytes", "name": "inputProof", "type": "bytes"},
                {"internalType": "uint256", "name": "publicValue1", "type": "uint256"},
                {"internalType": "uint256", "name": "publicValue2", "type": "uint256"},
                {"internalType": "string", "name": "description", "type": "string"}
            ],
            "name": "createBusinessData",
            "outputs": [],
            "stateMutability": "nonpayable",
            "type": "function"
        },
        {
            "inputs": [
                {"internalType": "string", "name": "businessId", "type": "string"},
                {"internalType": "bytes", "name": "abiEncodedClearValue", "type": "bytes"},
                {"internalType": "bytes", "name": "decryptionProof", "type": "bytes"}
            ],
            "name": "verifyDecryption",
            "outputs": [],
            "stateMutability": "nonpayable",
            "type": "function"
        }
    ]"#
);

/// Revert reason the registry uses when a decryption proof arrives for a
/// session that is already verified
pub const ALREADY_VERIFIED_REASON: &str = "Data already verified";
