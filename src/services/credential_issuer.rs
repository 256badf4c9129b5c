// src/services/credential_issuer.rs
//! Credential Issuer Service
//!
//! Issues JWT-encoded verifiable credentials signed with the issuer's
//! secp256k1 key (ES256K). A credential binds a subject DID to a flat set of
//! caller-supplied claims for a bounded number of days.
//!
//! A session may only request credentials about its own DID.

use crate::error::IdentityError;
use crate::models::credential::{CredentialBody, CredentialPayload, JwtHeader};
use crate::models::did::Did;
use crate::utils::serialization::{encode_segment, serialize_segment};
use crate::wallet::key_management::KeyManager;
use chrono::Utc;
use log::info;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;

/// JOSE algorithm name for ECDSA on secp256k1 with SHA-256
pub const CREDENTIAL_ALG: &str = "ES256K";

/// Upper bound on `validityDays`
pub const MAX_VALIDITY_DAYS: i64 = 365;

/// Validity used when the request omits `validityDays`
pub const DEFAULT_VALIDITY_DAYS: i64 = 365;

const SECONDS_PER_DAY: i64 = 86_400;

/// Request body of `POST /issue-vc`.
///
/// All fields are kept as raw JSON so the subject binding is checked before
/// the shape of anything else. A missing or non-string `subjectDid` is a
/// mismatch, not a malformed body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueRequest {
    #[serde(default)]
    pub subject_did: Option<Value>,

    #[serde(default)]
    pub credential_subject: Value,

    #[serde(default)]
    pub validity_days: Option<Value>,
}

/// A freshly signed credential.
#[derive(Debug, Clone)]
pub struct IssuedCredential {
    /// Compact `header.payload.signature` token
    pub token: String,
    pub jti: String,
    /// Unix seconds
    pub expires_at: i64,
}

/// Service issuing signed credentials in the name of one issuer DID.
#[derive(Clone)]
pub struct CredentialIssuer {
    /// DID written into the `iss` claim
    issuer_did: String,

    /// Issuer signing key
    key_manager: Arc<KeyManager>,
}

impl CredentialIssuer {
    /// Creates a new CredentialIssuer instance
    ///
    /// # Arguments
    /// * `issuer_did` - Configured issuer identifier
    /// * `key_manager` - Custody of the issuer signing key
    pub fn new(issuer_did: impl Into<String>, key_manager: Arc<KeyManager>) -> Self {
        Self {
            issuer_did: issuer_did.into(),
            key_manager,
        }
    }

    pub fn issuer_did(&self) -> &str {
        &self.issuer_did
    }

    /// Issues a credential for the session's own DID.
    ///
    /// # Errors
    /// - `SubjectMismatch` if `subjectDid` is not the session DID. This is
    ///   checked before anything else in the request.
    /// - `ValidationFailed` if the claims are not a flat object or
    ///   `validityDays` is not an integer in `[1, MAX_VALIDITY_DAYS]`
    pub fn issue(
        &self,
        session_did: &Did,
        request: &IssueRequest,
    ) -> Result<IssuedCredential, IdentityError> {
        self.issue_at(session_did, request, Utc::now().timestamp())
    }

    pub(crate) fn issue_at(
        &self,
        session_did: &Did,
        request: &IssueRequest,
        now: i64,
    ) -> Result<IssuedCredential, IdentityError> {
        let subject = request
            .subject_did
            .as_ref()
            .and_then(Value::as_str)
            .and_then(|subject| Did::parse(subject).ok())
            .filter(|subject| subject == session_did)
            .ok_or(IdentityError::SubjectMismatch)?;

        let claims = flat_claims(&request.credential_subject)?;
        let validity_days = validity_days(request.validity_days.as_ref())?;

        let payload = CredentialPayload {
            iss: self.issuer_did.clone(),
            sub: subject.to_string(),
            iat: now,
            exp: now + validity_days * SECONDS_PER_DAY,
            jti: format!("urn:uuid:{}", Uuid::new_v4()),
            vc: CredentialBody::new(&subject.to_string(), claims),
        };

        let token = self.sign(&payload)?;
        info!(
            "Issued credential {} to {} valid for {} days",
            payload.jti, payload.sub, validity_days
        );

        Ok(IssuedCredential {
            token,
            jti: payload.jti,
            expires_at: payload.exp,
        })
    }

    /// Encodes and signs `payload` as a compact ES256K JWT.
    fn sign(&self, payload: &CredentialPayload) -> Result<String, IdentityError> {
        let header = JwtHeader {
            alg: CREDENTIAL_ALG.to_string(),
            typ: Some("JWT".to_string()),
        };

        let header = serialize_segment(&header).map_err(|e| IdentityError::Signing(e.to_string()))?;
        let payload = serialize_segment(payload).map_err(|e| IdentityError::Signing(e.to_string()))?;
        let signing_input = format!("{}.{}", header, payload);

        let signature = self.key_manager.sign_message(signing_input.as_bytes())?;
        Ok(format!("{}.{}", signing_input, encode_segment(&signature)))
    }
}

/// Accepts a JSON object whose values are all scalars.
fn flat_claims(value: &Value) -> Result<&Map<String, Value>, IdentityError> {
    let claims = value.as_object().ok_or_else(|| {
        IdentityError::ValidationFailed("credentialSubject must be an object".into())
    })?;

    if let Some((key, _)) = claims.iter().find(|(_, v)| v.is_object() || v.is_array()) {
        return Err(IdentityError::ValidationFailed(format!(
            "credentialSubject.{} must be a string, number, boolean or null",
            key
        )));
    }

    Ok(claims)
}

fn validity_days(value: Option<&Value>) -> Result<i64, IdentityError> {
    let Some(value) = value.filter(|v| !v.is_null()) else {
        return Ok(DEFAULT_VALIDITY_DAYS);
    };

    value
        .as_i64()
        .filter(|days| (1..=MAX_VALIDITY_DAYS).contains(days))
        .ok_or_else(|| {
            IdentityError::ValidationFailed(format!(
                "validityDays must be an integer between 1 and {}",
                MAX_VALIDITY_DAYS
            ))
        })
}
