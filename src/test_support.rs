// src/test_support.rs
//! Shared fixtures for unit tests.

use crate::models::did::Did;
use ethers::signers::{LocalWallet, Signer};
use ethers::utils::hex;
use k256::ecdsa::SigningKey;

/// Local development chain id used throughout the tests
pub const TEST_CHAIN_ID: u64 = 31337;

pub const TEST_SESSION_SECRET: &str = "test-session-secret-with-at-least-32-bytes";

/// `did:pkh` identifier for a wallet on the test chain.
pub fn wallet_did(wallet: &LocalWallet) -> Did {
    Did::parse(&format!("did:pkh:eip155:{}:0x{:x}", TEST_CHAIN_ID, wallet.address())).unwrap()
}

/// Fresh random issuer key, hex-encoded.
pub fn random_key_hex() -> String {
    let key = SigningKey::random(&mut rand::thread_rng());
    hex::encode(key.to_bytes())
}
