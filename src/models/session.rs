// src/models/session.rs
//! Session token claims.

use serde::{Deserialize, Serialize};

/// Claims embedded in a session token.
///
/// The token is self-contained: its signature proves these claims, so no
/// server-side session record exists.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    /// Verified DID the session is bound to
    pub sub: String,

    /// Issued-at, Unix seconds
    pub iat: i64,

    /// Expiry, Unix seconds
    pub exp: i64,
}
