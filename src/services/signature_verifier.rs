// src/services/signature_verifier.rs
//! Challenge signature verification.
//!
//! Clients sign the challenge nonce with `personal_sign` (EIP-191): the
//! message is prefixed with `"\x19Ethereum Signed Message:\n" + len`, hashed
//! with Keccak-256 and signed on secp256k1. The verifier recovers the signing
//! address from the 65-byte `r || s || v` signature and compares it with the
//! account embedded in the DID.

use crate::error::IdentityError;
use crate::models::did::Did;
use ethers::types::Signature;
use log::debug;
use std::str::FromStr;

/// Stateless verifier for EIP-191 personal-message signatures.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureVerifier;

impl SignatureVerifier {
    pub fn new() -> Self {
        SignatureVerifier
    }

    /// Verifies that `signature` over `message` was produced by the account
    /// in `did`.
    ///
    /// # Arguments
    /// * `did` - The claimed identity
    /// * `message` - The exact message that was signed (the challenge nonce)
    /// * `signature` - Hex-encoded 65-byte signature, `0x` prefix optional
    ///
    /// # Errors
    /// `IdentityError::SignatureInvalid` if the signature cannot be decoded,
    /// no address can be recovered, or the recovered address differs from
    /// the DID's account.
    pub fn verify(&self, did: &Did, message: &str, signature: &str) -> Result<(), IdentityError> {
        let signature = Signature::from_str(signature.trim()).map_err(|e| {
            debug!("Undecodable signature for {}: {}", did, e);
            IdentityError::SignatureInvalid
        })?;

        let recovered = signature.recover(message).map_err(|e| {
            debug!("Signature recovery failed for {}: {}", did, e);
            IdentityError::SignatureInvalid
        })?;

        let recovered = format!("0x{:x}", recovered);
        if !did.matches_account(&recovered) {
            debug!("Recovered {} does not match {}", recovered, did);
            return Err(IdentityError::SignatureInvalid);
        }

        Ok(())
    }
}
