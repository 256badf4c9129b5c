// src/models/credential.rs
//! Verifiable Credential data model implementation.
//!
//! Defines the JWT payload of an issued credential, following the JWT
//! encoding of the [W3C Verifiable Credentials Data Model](https://www.w3.org/TR/vc-data-model/#json-web-token).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON-LD context every issued credential declares
pub const VC_CONTEXT: &str = "https://www.w3.org/2018/credentials/v1";

/// Base credential type
pub const VC_TYPE: &str = "VerifiableCredential";

/// JOSE header of a credential token.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct JwtHeader {
    /// Signature algorithm, e.g. "ES256K"
    pub alg: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
}

/// Registered claims plus the `vc` section of a credential token.
///
/// # Fields
/// - `iss`: DID of the issuing service
/// - `sub`: DID of the credential subject
/// - `iat` / `exp`: Unix timestamps in seconds
/// - `jti`: Unique credential identifier, reserved for revocation tracking
/// - `vc`: The credential body
///
/// Once signed the payload is never mutated.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CredentialPayload {
    pub iss: String,
    pub sub: String,
    pub iat: i64,
    pub exp: i64,

    /// Example: "urn:uuid:123e4567-e89b-12d3-a456-426614174000"
    pub jti: String,

    pub vc: CredentialBody,
}

/// The `vc` claim of a credential token.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CredentialBody {
    #[serde(rename = "@context")]
    pub context: Vec<String>,

    #[serde(rename = "type")]
    pub types: Vec<String>,

    /// Subject `id` plus the caller-supplied flat claims
    /// Example: {"id": "did:pkh:eip155:1:0x…", "name": "Test Document"}
    pub credential_subject: Map<String, Value>,
}

impl CredentialBody {
    /// Builds the credential body for `subject`, merging `claims` in.
    ///
    /// The subject `id` is written last so a caller-supplied `id` claim can
    /// never rebind the credential to another subject.
    pub fn new(subject: &str, claims: &Map<String, Value>) -> Self {
        let mut credential_subject = claims.clone();
        credential_subject.insert("id".to_string(), Value::String(subject.to_string()));

        Self {
            context: vec![VC_CONTEXT.to_string()],
            types: vec![VC_TYPE.to_string()],
            credential_subject,
        }
    }
}
