// src/error.rs
//! Domain errors for the authentication and credential core.
//!
//! Every component returns [`IdentityError`]. The HTTP layer maps each variant
//! onto one of the boundary kinds in `services::api_error`.

use thiserror::Error;

/// Failure kinds raised by the challenge, session and credential components.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// The identifier is not a well-formed `did:pkh:eip155` string
    #[error("Invalid DID format: {0}")]
    InvalidFormat(String),

    /// No live challenge matched. Never-issued, expired and wrong-nonce
    /// lookups all collapse into this one variant.
    #[error("Challenge not found or expired")]
    ChallengeNotFound,

    #[error("Invalid signature")]
    SignatureInvalid,

    #[error("No session token provided")]
    NoSessionToken,

    #[error("Invalid or expired session token")]
    InvalidSessionToken,

    /// The authenticated session may only obtain credentials about itself
    #[error("Subject DID does not match the authenticated session")]
    SubjectMismatch,

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// Key material could not be loaded
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Unexpected fault while building or signing a token
    #[error("Signing failed: {0}")]
    Signing(String),
}
