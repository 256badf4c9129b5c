// src/services/verifier.rs
//! Credential verification service for the DID system.
//!
//! Verification needs only the issuer's public key. No session, store or
//! network access is involved, so any party holding the key can run it.

use crate::error::IdentityError;
use crate::models::credential::{CredentialPayload, JwtHeader};
use crate::services::credential_issuer::CREDENTIAL_ALG;
use crate::utils::serialization::{decode_segment, deserialize_segment};
use chrono::Utc;
use k256::ecdsa::signature::Verifier as _;
use k256::ecdsa::{Signature, VerifyingKey};
use log::debug;

/// Outcome of verifying a well-formed, correctly signed credential.
///
/// Signature validity and expiry are reported separately so callers can tell
/// a forged token from a stale one.
#[derive(Debug, Clone)]
pub struct VerificationOutcome {
    pub valid: bool,
    pub expired: bool,
    pub payload: CredentialPayload,
}

/// Credential verifier bound to one issuer public key.
#[derive(Debug, Clone)]
pub struct CredentialVerifier {
    /// Issuer public key (secp256k1)
    issuer_key: VerifyingKey,
}

impl CredentialVerifier {
    pub fn new(issuer_key: VerifyingKey) -> Self {
        Self { issuer_key }
    }

    /// Verifies a compact credential token.
    ///
    /// # Returns
    /// - `Ok(outcome)` with `valid = true` once the signature checks out;
    ///   `expired` is set when `exp` lies in the past
    /// - `Err(MalformedToken)` if the token is not three non-empty segments,
    ///   or any segment fails to decode
    /// - `Err(SignatureInvalid)` if the header names another algorithm or the
    ///   signature does not match
    ///
    /// # Process Flow
    /// 1. Splits the token; no cryptography is attempted on malformed input
    /// 2. Decodes the header and checks its algorithm
    /// 3. Verifies the signature over `header.payload`
    /// 4. Decodes the payload and evaluates expiry
    pub fn verify(&self, token: &str) -> Result<VerificationOutcome, IdentityError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    pub(crate) fn verify_at(&self, token: &str, now: i64) -> Result<VerificationOutcome, IdentityError> {
        let segments: Vec<&str> = token.trim().split('.').collect();
        let [header, payload, signature] = segments.as_slice() else {
            return Err(IdentityError::MalformedToken(
                "expected three dot-separated segments".into(),
            ));
        };
        if header.is_empty() || payload.is_empty() || signature.is_empty() {
            return Err(IdentityError::MalformedToken("empty token segment".into()));
        }

        let parsed_header: JwtHeader = deserialize_segment(header)
            .map_err(|e| IdentityError::MalformedToken(format!("header: {}", e)))?;
        let signature_bytes = decode_segment(signature)
            .map_err(|e| IdentityError::MalformedToken(format!("signature: {}", e)))?;

        if parsed_header.alg != CREDENTIAL_ALG {
            debug!("Rejected credential with algorithm {}", parsed_header.alg);
            return Err(IdentityError::SignatureInvalid);
        }

        let signature =
            Signature::from_slice(&signature_bytes).map_err(|_| IdentityError::SignatureInvalid)?;
        let signing_input = format!("{}.{}", header, payload);
        self.issuer_key
            .verify(signing_input.as_bytes(), &signature)
            .map_err(|_| IdentityError::SignatureInvalid)?;

        let payload: CredentialPayload = deserialize_segment(payload)
            .map_err(|e| IdentityError::MalformedToken(format!("payload: {}", e)))?;

        Ok(VerificationOutcome {
            valid: true,
            expired: payload.exp < now,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::did::Did;
    use crate::services::credential_issuer::{CredentialIssuer, IssueRequest};
    use crate::test_support::random_key_hex;
    use crate::utils::serialization::serialize_segment;
    use crate::wallet::key_management::KeyManager;
    use serde_json::json;
    use std::sync::Arc;

    const SUBJECT: &str = "did:pkh:eip155:31337:0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";
    const ISSUER: &str = "did:pkh:eip155:31337:0x70997970c51812dc3a010c7d01b50e0d17dc79c8";

    fn setup() -> (CredentialIssuer, CredentialVerifier) {
        let key_manager = Arc::new(KeyManager::from_hex(&random_key_hex()).unwrap());
        let verifier = CredentialVerifier::new(key_manager.verifying_key.clone());
        (CredentialIssuer::new(ISSUER, key_manager), verifier)
    }

    fn request(validity_days: i64) -> IssueRequest {
        IssueRequest {
            subject_did: Some(json!(SUBJECT)),
            credential_subject: json!({"name": "Test Document"}),
            validity_days: Some(json!(validity_days)),
        }
    }

    fn session() -> Did {
        Did::parse(SUBJECT).unwrap()
    }

    #[test]
    fn test_fresh_credential_is_valid_and_unexpired() {
        let (issuer, verifier) = setup();
        let issued = issuer.issue(&session(), &request(30)).unwrap();

        let outcome = verifier.verify(&issued.token).unwrap();

        assert!(outcome.valid);
        assert!(!outcome.expired);
        assert_eq!(outcome.payload.jti, issued.jti);
        assert_eq!(outcome.payload.exp, issued.expires_at);
    }

    #[test]
    fn test_expired_credential_is_valid_but_expired() {
        let (issuer, verifier) = setup();
        let long_ago = Utc::now().timestamp() - 2 * 86_400;
        let issued = issuer.issue_at(&session(), &request(1), long_ago).unwrap();

        let outcome = verifier.verify(&issued.token).unwrap();

        assert!(outcome.valid);
        assert!(outcome.expired);
    }

    #[test]
    fn test_expiry_boundary() {
        let (issuer, verifier) = setup();
        let issued = issuer.issue(&session(), &request(1)).unwrap();

        assert!(!verifier.verify_at(&issued.token, issued.expires_at).unwrap().expired);
        assert!(verifier.verify_at(&issued.token, issued.expires_at + 1).unwrap().expired);
    }

    #[test]
    fn test_malformed_tokens_are_rejected_before_crypto() {
        let (_, verifier) = setup();

        for token in ["", "abc", "a.b", "a.b.c.d", ".b.c", "a..c", "a.b.", "no-dots-at-all"] {
            assert!(
                matches!(verifier.verify(token), Err(IdentityError::MalformedToken(_))),
                "expected MalformedToken for {:?}",
                token
            );
        }
    }

    #[test]
    fn test_tampered_payload_fails_signature() {
        let (issuer, verifier) = setup();
        let issued = issuer.issue(&session(), &request(30)).unwrap();
        let parts: Vec<&str> = issued.token.split('.').collect();

        let mut payload: CredentialPayload = deserialize_segment(parts[1]).unwrap();
        payload.exp += 86_400 * 1000;
        let forged = format!("{}.{}.{}", parts[0], serialize_segment(&payload).unwrap(), parts[2]);

        assert_eq!(verifier.verify(&forged).unwrap_err(), IdentityError::SignatureInvalid);
    }

    #[test]
    fn test_token_from_other_issuer_fails_signature() {
        let (issuer, _) = setup();
        let (_, other_verifier) = setup();
        let issued = issuer.issue(&session(), &request(30)).unwrap();

        assert_eq!(
            other_verifier.verify(&issued.token).unwrap_err(),
            IdentityError::SignatureInvalid
        );
    }

    #[test]
    fn test_unsigned_algorithm_is_rejected() {
        let (issuer, verifier) = setup();
        let issued = issuer.issue(&session(), &request(30)).unwrap();
        let parts: Vec<&str> = issued.token.split('.').collect();

        let none_header = serialize_segment(&json!({"alg": "none", "typ": "JWT"})).unwrap();
        let forged = format!("{}.{}.{}", none_header, parts[1], parts[2]);

        assert_eq!(verifier.verify(&forged).unwrap_err(), IdentityError::SignatureInvalid);
    }

    #[test]
    fn test_undecodable_header_is_malformed() {
        let (_, verifier) = setup();
        assert!(matches!(
            verifier.verify("!!!.payload.signature"),
            Err(IdentityError::MalformedToken(_))
        ));
    }
}
