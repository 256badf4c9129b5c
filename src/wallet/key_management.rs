// src/wallet/key_management.rs
//! Cryptographic key management for the credential issuer.
//!
//! Holds the issuer's secp256k1 signing key and exposes:
//! - ES256K signatures (ECDSA over SHA-256, RFC 6979 nonces, low-S)
//! - The public verifying key handed to offline verifiers
//! - The Ethereum-style address derived from that key

use crate::error::IdentityError;
use crate::utils::crypto::address_from_uncompressed_key;
use ethers::utils::hex;
use k256::ecdsa::signature::Signer;
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};

/// Custody of the issuer signing key.
///
/// # Security Notes
/// - The secret scalar is never exposed after loading
/// - `Debug` is intentionally not derived
#[derive(Clone)]
pub struct KeyManager {
    /// Issuer signing key
    signing_key: SigningKey,
    /// Derived public key for verification
    pub verifying_key: VerifyingKey,
}

impl KeyManager {
    /// Loads the signing key from a hex-encoded 32-byte scalar.
    ///
    /// # Arguments
    /// * `private_key` - Hex string, with or without `0x` prefix
    ///
    /// # Errors
    /// Returns `IdentityError::InvalidKey` if the string is not hex, is not
    /// 32 bytes, or is not a valid non-zero scalar for secp256k1.
    pub fn from_hex(private_key: &str) -> Result<Self, IdentityError> {
        let trimmed = private_key.trim();
        let hex_key = trimmed.strip_prefix("0x").unwrap_or(trimmed);

        let bytes = hex::decode(hex_key)
            .map_err(|e| IdentityError::InvalidKey(format!("not hex: {}", e)))?;
        if bytes.len() != 32 {
            return Err(IdentityError::InvalidKey(format!(
                "expected 32 bytes, got {}",
                bytes.len()
            )));
        }

        let signing_key = SigningKey::from_slice(&bytes)
            .map_err(|_| IdentityError::InvalidKey("not a valid secp256k1 scalar".into()))?;

        Ok(Self::from_signing_key(signing_key))
    }

    pub fn from_signing_key(signing_key: SigningKey) -> Self {
        let verifying_key = signing_key.verifying_key().clone();
        KeyManager {
            signing_key,
            verifying_key,
        }
    }

    /// Signs a message with ES256K.
    ///
    /// # Returns
    /// 64-byte compact ECDSA signature (R || S values)
    ///
    /// # Process Flow
    /// 1. Hashes message with SHA-256
    /// 2. Signs the hash using deterministic ECDSA (RFC 6979)
    /// 3. Serializes signature in compact, low-S normalized form
    pub fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, IdentityError> {
        let signature: Signature = self
            .signing_key
            .try_sign(message)
            .map_err(|e| IdentityError::Signing(e.to_string()))?;

        let signature = signature.normalize_s().unwrap_or(signature);
        Ok(signature.to_vec())
    }

    /// Compressed SEC1 public key, hex-encoded (33 bytes).
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.verifying_key.to_encoded_point(true).as_bytes())
    }

    /// Ethereum-style account address of the issuer key.
    pub fn address(&self) -> String {
        let uncompressed = self.verifying_key.to_encoded_point(false);
        // A verifying key always encodes to a 65-byte uncompressed point.
        address_from_uncompressed_key(uncompressed.as_bytes()).unwrap_or_default()
    }
}
