// src/services/session_manager.rs
//! Session token issuance and validation.
//!
//! A session is an HS256 JWT binding a verified DID for ten minutes. The
//! signature is the only proof of authenticity, so no session record is kept
//! server-side and instances need no coordination. The HMAC secret is
//! separate from the credential signing key.

use crate::error::IdentityError;
use crate::models::did::Did;
use crate::models::session::SessionClaims;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::debug;

/// Session lifetime in seconds. Sessions are not renewable.
pub const SESSION_TTL_SECS: i64 = 600;

const BEARER_SCHEME: &str = "Bearer";

/// Result of a successful `issue_session` call.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expires_in: i64,
}

/// Mints and validates session tokens.
#[derive(Clone)]
pub struct SessionManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl SessionManager {
    /// Creates a manager from the raw session secret.
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Issues a session token bound to `did`.
    pub fn issue_session(&self, did: &Did) -> Result<IssuedSession, IdentityError> {
        self.issue_session_at(did, Utc::now().timestamp())
    }

    fn issue_session_at(&self, did: &Did, now: i64) -> Result<IssuedSession, IdentityError> {
        let claims = SessionClaims {
            sub: did.to_string(),
            iat: now,
            exp: now + SESSION_TTL_SECS,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| IdentityError::Signing(e.to_string()))?;

        Ok(IssuedSession {
            token,
            expires_in: SESSION_TTL_SECS,
        })
    }

    /// Validates the value of an `Authorization` header and returns the
    /// bound DID.
    ///
    /// # Errors
    /// - `NoSessionToken` when the header is absent or carries no bearer token.
    ///   The scheme name is matched case-insensitively.
    /// - `InvalidSessionToken` when the token is malformed, signed with another
    ///   key or algorithm, or expired
    pub fn validate_session(&self, authorization: Option<&str>) -> Result<Did, IdentityError> {
        let token = authorization
            .and_then(|value| value.trim().split_once(' '))
            .filter(|(scheme, _)| scheme.eq_ignore_ascii_case(BEARER_SCHEME))
            .map(|(_, token)| token.trim())
            .filter(|token| !token.is_empty())
            .ok_or(IdentityError::NoSessionToken)?;

        self.validate_token(token)
    }

    /// Validates a bare session token.
    pub fn validate_token(&self, token: &str) -> Result<Did, IdentityError> {
        let data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            debug!("Rejected session token: {}", e);
            IdentityError::InvalidSessionToken
        })?;

        Did::parse(&data.claims.sub).map_err(|_| IdentityError::InvalidSessionToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TEST_SESSION_SECRET;

    fn did() -> Did {
        Did::parse("did:pkh:eip155:31337:0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266").unwrap()
    }

    fn manager() -> SessionManager {
        SessionManager::new(TEST_SESSION_SECRET.as_bytes())
    }

    #[test]
    fn test_issued_session_validates() {
        let manager = manager();
        let session = manager.issue_session(&did()).unwrap();

        assert_eq!(session.expires_in, 600);
        let header = format!("Bearer {}", session.token);
        assert_eq!(manager.validate_session(Some(&header)).unwrap(), did());
    }

    #[test]
    fn test_missing_bearer_token() {
        let manager = manager();

        assert_eq!(manager.validate_session(None), Err(IdentityError::NoSessionToken));
        assert_eq!(manager.validate_session(Some("")), Err(IdentityError::NoSessionToken));
        assert_eq!(manager.validate_session(Some("Bearer ")), Err(IdentityError::NoSessionToken));
        assert_eq!(
            manager.validate_session(Some("Basic dXNlcjpwYXNz")),
            Err(IdentityError::NoSessionToken)
        );
    }

    #[test]
    fn test_bearer_scheme_ignores_case() {
        let manager = manager();
        let session = manager.issue_session(&did()).unwrap();

        for scheme in ["bearer", "BEARER", "bEaReR"] {
            let header = format!("{} {}", scheme, session.token);
            assert_eq!(manager.validate_session(Some(&header)).unwrap(), did());
        }
        assert_eq!(manager.validate_session(Some("bearer ")), Err(IdentityError::NoSessionToken));
        assert_eq!(
            manager.validate_session(Some("bearer garbage")),
            Err(IdentityError::InvalidSessionToken)
        );
    }

    #[test]
    fn test_garbage_token_is_invalid() {
        assert_eq!(
            manager().validate_session(Some("Bearer not.a.jwt")),
            Err(IdentityError::InvalidSessionToken)
        );
    }

    #[test]
    fn test_token_from_other_secret_is_invalid() {
        let other = SessionManager::new(b"a-completely-different-session-secret");
        let session = other.issue_session(&did()).unwrap();

        assert_eq!(
            manager().validate_token(&session.token),
            Err(IdentityError::InvalidSessionToken)
        );
    }

    #[test]
    fn test_expired_token_is_invalid() {
        let manager = manager();
        let now = Utc::now().timestamp();
        let session = manager.issue_session_at(&did(), now - SESSION_TTL_SECS - 5).unwrap();

        assert_eq!(
            manager.validate_token(&session.token),
            Err(IdentityError::InvalidSessionToken)
        );
    }

    #[test]
    fn test_tampered_claims_are_invalid() {
        let manager = manager();
        let session = manager.issue_session(&did()).unwrap();
        let parts: Vec<&str> = session.token.split('.').collect();

        let forged_claims = SessionClaims {
            sub: "did:pkh:eip155:31337:0x70997970c51812dc3a010c7d01b50e0d17dc79c8".into(),
            iat: Utc::now().timestamp(),
            exp: Utc::now().timestamp() + SESSION_TTL_SECS,
        };
        let forged_payload = crate::utils::serialization::serialize_segment(&forged_claims).unwrap();
        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        assert_eq!(
            manager.validate_token(&forged),
            Err(IdentityError::InvalidSessionToken)
        );
    }
}
