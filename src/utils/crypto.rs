// src/utils/crypto.rs
//! Cryptographic utilities optimized for blockchain compatibility.
//!
//! Keccak-256 is used for account derivation, the OS RNG for nonces.

use ethers::utils::{hex, keccak256};
use rand::{rngs::OsRng, RngCore};
use subtle::ConstantTimeEq;

/// Number of random bytes in a challenge nonce
pub const NONCE_BYTES: usize = 32;

/// Computes a Keccak-256 hash of the input data (Ethereum-compatible).
///
/// # Arguments
/// * `data` - Binary data to hash (as bytes slice)
///
/// # Returns
/// Fixed-size 32-byte array (`[u8; 32]`) containing the hash.
pub fn hash_data(data: &[u8]) -> [u8; 32] {
    keccak256(data)
}

/// Derives the `0x`-prefixed lowercase account address from an uncompressed
/// SEC1 public key (65 bytes, leading `0x04`).
///
/// Returns `None` for any other encoding.
pub fn address_from_uncompressed_key(public_key: &[u8]) -> Option<String> {
    if public_key.len() != 65 || public_key[0] != 0x04 {
        return None;
    }

    let hash = hash_data(&public_key[1..]);
    Some(format!("0x{}", hex::encode(&hash[12..])))
}

/// Generates a hex-encoded nonce from the operating system CSPRNG.
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; NONCE_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Compares two strings in time independent of where they first differ.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
