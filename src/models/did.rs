// src/models/did.rs
//! Decentralized Identifier (DID) data model implementation.
//!
//! Supports a single chain-qualified account method, `did:pkh`, with the
//! `eip155` namespace (see [CAIP-10](https://chainagnostic.org/CAIPs/caip-10)).

use crate::error::IdentityError;
use std::fmt;
use std::str::FromStr;

const DID_SCHEME: &str = "did";
const DID_METHOD: &str = "pkh";
const DID_NAMESPACE: &str = "eip155";

/// A parsed `did:pkh:eip155` identifier.
///
/// # DID Format
/// ```text
/// did:pkh:eip155:<chainId>:<accountAddress>
/// ```
///
/// The account address is the proof target for challenge signatures. It is
/// stored lowercase so that two spellings of the same account compare equal
/// and serialize identically.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Did {
    /// Decimal EIP-155 chain id, kept as written
    /// Example: "31337"
    chain_id: String,

    /// Lowercase `0x`-prefixed 20-byte account address
    /// Example: "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
    account: String,
}

impl Did {
    /// Parses and normalizes an identifier string.
    ///
    /// # Errors
    /// Returns `IdentityError::InvalidFormat` if the string is not exactly five
    /// colon-separated parts, uses another method or namespace, has a
    /// non-numeric chain id, or an account that is not `0x` + 40 hex digits.
    pub fn parse(input: &str) -> Result<Self, IdentityError> {
        let invalid = || IdentityError::InvalidFormat(input.to_string());

        let parts: Vec<&str> = input.trim().split(':').collect();
        let [scheme, method, namespace, chain_id, account] = parts.as_slice() else {
            return Err(invalid());
        };

        if *scheme != DID_SCHEME || *method != DID_METHOD || *namespace != DID_NAMESPACE {
            return Err(invalid());
        }

        if chain_id.is_empty() || chain_id.len() > 32 || !chain_id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let hex = account
            .strip_prefix("0x")
            .or_else(|| account.strip_prefix("0X"))
            .ok_or_else(invalid)?;
        if hex.len() != 40 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        Ok(Self {
            chain_id: chain_id.to_string(),
            account: format!("0x{}", hex.to_ascii_lowercase()),
        })
    }

    /// Lowercase account address embedded in the identifier.
    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    /// Case-insensitive comparison against a `0x`-prefixed address string.
    pub fn matches_account(&self, address: &str) -> bool {
        self.account.eq_ignore_ascii_case(address)
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}:{}",
            DID_SCHEME, DID_METHOD, DID_NAMESPACE, self.chain_id, self.account
        )
    }
}

impl FromStr for Did {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Did::parse(s)
    }
}
