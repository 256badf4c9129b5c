// src/services/api_server.rs
//! API Server for the Decentralized Identity System
//!
//! This module provides the REST API for DID authentication and credential
//! issuance. The flow is:
//! 1. `GET /challenge` issues a single-use nonce for a DID
//! 2. `POST /verify-challenge` checks the wallet signature over that nonce and
//!    returns a session token
//! 3. `POST /issue-vc` turns a session into a signed credential about the
//!    session's own DID
//! 4. `GET /verify-vc` verifies any credential with the issuer public key
//!
//! All handlers share one [`ApiServer`] state. Failures are returned through
//! [`ApiError`].

use crate::models::credential::CredentialPayload;
use crate::models::did::Did;
use crate::services::api_error::ApiError;
use crate::services::credential_issuer::{CredentialIssuer, IssueRequest, CREDENTIAL_ALG};
use crate::services::session_manager::SessionManager;
use crate::services::signature_verifier::SignatureVerifier;
use crate::services::verifier::CredentialVerifier;
use crate::storage::challenge_store::ChallengeStore;
use crate::wallet::key_management::KeyManager;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Json, Query, State,
    },
    http::{header::AUTHORIZATION, HeaderMap},
    routing::{get, post},
    Router,
};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

// API request and response structures

/// Query of `GET /challenge`
#[derive(Deserialize)]
struct ChallengeQuery {
    did: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChallengeResponse {
    success: bool,
    challenge: String,
    expires_in: i64,
}

/// Request payload for proving control of a DID
#[derive(Deserialize)]
struct VerifyChallengeRequest {
    did: String,
    challenge: String,
    signature: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyChallengeResponse {
    success: bool,
    session_token: String,
    expires_in: i64,
    message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IssueVcResponse {
    success: bool,
    jwt_vc: String,
    jti: String,
    /// Unix seconds
    expires_at: i64,
}

/// Query of `GET /verify-vc`
#[derive(Deserialize)]
struct VerifyVcQuery {
    jwt: Option<String>,
}

#[derive(Serialize)]
struct VerifyVcResponse {
    success: bool,
    valid: bool,
    expired: bool,
    payload: CredentialPayload,
}

/// Public key material for offline verifiers
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IssuerResponse {
    success: bool,
    issuer: String,
    alg: &'static str,
    /// Compressed SEC1, hex
    public_key: String,
    address: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// API server state containing all service dependencies
#[derive(Clone)]
pub struct ApiServer {
    /// Single-use challenge nonces
    challenge_store: ChallengeStore,

    /// Wallet signature recovery
    signature_verifier: SignatureVerifier,

    /// Session token minting and validation
    session_manager: Arc<SessionManager>,

    /// Service for issuing credentials
    credential_issuer: Arc<CredentialIssuer>,

    /// Service for verifying credentials
    verifier: Arc<CredentialVerifier>,

    /// Issuer key, for publishing the public half
    key_manager: Arc<KeyManager>,
}

impl ApiServer {
    /// Creates a new instance of the API server
    ///
    /// # Arguments
    /// * `challenge_store` - Store shared by all handlers
    /// * `session_manager` - Session token service
    /// * `credential_issuer` - Service for credential issuance
    /// * `key_manager` - Issuer key, also used to build the verifier
    pub fn new(
        challenge_store: ChallengeStore,
        session_manager: SessionManager,
        credential_issuer: CredentialIssuer,
        key_manager: Arc<KeyManager>,
    ) -> Self {
        ApiServer {
            challenge_store,
            signature_verifier: SignatureVerifier::new(),
            session_manager: Arc::new(session_manager),
            credential_issuer: Arc::new(credential_issuer),
            verifier: Arc::new(CredentialVerifier::new(key_manager.verifying_key.clone())),
            key_manager,
        }
    }

    /// Builds the router with all API routes
    pub fn router(&self) -> Router {
        // Browser wallets call the API cross-origin
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/health", get(Self::health_handler))
            .route("/issuer", get(Self::issuer_handler))
            .route("/challenge", get(Self::challenge_handler))
            .route("/verify-challenge", post(Self::verify_challenge_handler))
            .route("/issue-vc", post(Self::issue_vc_handler))
            .route("/verify-vc", get(Self::verify_vc_handler))
            .fallback(Self::not_found_handler)
            .layer(cors)
            .with_state(Arc::new(self.clone()))
    }

    /// Starts the API server and serves until `shutdown` resolves
    ///
    /// # Arguments
    /// * `addr` - Socket address to bind to (e.g., "127.0.0.1:3000")
    /// * `shutdown` - Future completing when the server should stop
    pub async fn run<F>(self, addr: SocketAddr, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("API server running at http://{}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
    }

    // =====================
    // Service Handlers
    // =====================

    /// Liveness probe
    async fn health_handler() -> Json<HealthResponse> {
        Json(HealthResponse {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        })
    }

    /// Publishes the issuer DID and public key
    ///
    /// # Endpoint
    /// GET /issuer
    async fn issuer_handler(State(state): State<Arc<ApiServer>>) -> Json<IssuerResponse> {
        Json(IssuerResponse {
            success: true,
            issuer: state.credential_issuer.issuer_did().to_string(),
            alg: CREDENTIAL_ALG,
            public_key: state.key_manager.public_key_hex(),
            address: state.key_manager.address(),
        })
    }

    async fn not_found_handler() -> ApiError {
        ApiError::NotFound("Not found".into())
    }

    // =====================
    // Authentication Handlers
    // =====================

    /// Issues a challenge nonce for a DID
    ///
    /// # Endpoint
    /// GET /challenge?did=<did>
    ///
    /// # Responses
    /// - 200 OK: Returns the nonce and its lifetime
    /// - 400 Bad Request: Missing or malformed DID
    async fn challenge_handler(
        State(state): State<Arc<ApiServer>>,
        query: Result<Query<ChallengeQuery>, QueryRejection>,
    ) -> Result<Json<ChallengeResponse>, ApiError> {
        let Query(query) = query?;
        let did = query
            .did
            .filter(|did| !did.trim().is_empty())
            .ok_or_else(|| ApiError::ValidationFailed("Missing did parameter".into()))?;

        let issued = state.challenge_store.generate(&did)?;

        Ok(Json(ChallengeResponse {
            success: true,
            challenge: issued.challenge,
            expires_in: issued.expires_in,
        }))
    }

    /// Verifies a signed challenge and opens a session
    ///
    /// # Endpoint
    /// POST /verify-challenge
    ///
    /// # Request Body
    /// `{did, challenge, signature}`
    ///
    /// # Responses
    /// - 200 OK: Returns a session token
    /// - 400 Bad Request: Malformed body or DID
    /// - 401 Unauthorized: Unknown challenge or invalid signature
    async fn verify_challenge_handler(
        State(state): State<Arc<ApiServer>>,
        payload: Result<Json<VerifyChallengeRequest>, JsonRejection>,
    ) -> Result<Json<VerifyChallengeResponse>, ApiError> {
        let Json(payload) = payload?;
        let did = Did::parse(&payload.did)?;

        // Consumed before the signature check so a failed attempt burns it.
        state
            .challenge_store
            .consume(&did, &payload.challenge)
            .map_err(|e| {
                warn!("Challenge rejected for {}", did);
                e
            })?;

        state
            .signature_verifier
            .verify(&did, &payload.challenge, &payload.signature)
            .map_err(|e| {
                warn!("Signature rejected for {}", did);
                e
            })?;

        let session = state.session_manager.issue_session(&did)?;
        info!("Authenticated {}", did);

        Ok(Json(VerifyChallengeResponse {
            success: true,
            session_token: session.token,
            expires_in: session.expires_in,
            message: "Authentication successful".into(),
        }))
    }

    // =====================
    // Credential Handlers
    // =====================

    /// Issues a credential for the authenticated DID
    ///
    /// # Endpoint
    /// POST /issue-vc
    ///
    /// # Headers
    /// `Authorization: Bearer <sessionToken>`
    ///
    /// # Request Body
    /// `{subjectDid, credentialSubject, validityDays?}`
    ///
    /// # Responses
    /// - 200 OK: Returns the signed credential
    /// - 400 Bad Request: Invalid claims or validity
    /// - 401 Unauthorized: Missing or invalid session token
    /// - 403 Forbidden: Subject is not the session DID
    async fn issue_vc_handler(
        State(state): State<Arc<ApiServer>>,
        headers: HeaderMap,
        payload: Result<Json<IssueRequest>, JsonRejection>,
    ) -> Result<Json<IssueVcResponse>, ApiError> {
        let authorization = headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok());
        let session_did = state.session_manager.validate_session(authorization)?;

        let Json(request) = payload?;
        let issued = state
            .credential_issuer
            .issue(&session_did, &request)
            .map_err(|e| {
                warn!("Credential request from {} rejected: {}", session_did, e);
                e
            })?;

        Ok(Json(IssueVcResponse {
            success: true,
            jwt_vc: issued.token,
            jti: issued.jti,
            expires_at: issued.expires_at,
        }))
    }

    /// Verifies a credential token
    ///
    /// # Endpoint
    /// GET /verify-vc?jwt=<token>
    ///
    /// # Responses
    /// - 200 OK: Signature valid; `expired` tells whether it is still current
    /// - 400 Bad Request: Missing parameter or malformed token
    /// - 401 Unauthorized: Signature does not verify
    async fn verify_vc_handler(
        State(state): State<Arc<ApiServer>>,
        query: Result<Query<VerifyVcQuery>, QueryRejection>,
    ) -> Result<Json<VerifyVcResponse>, ApiError> {
        let Query(query) = query?;
        let token = query
            .jwt
            .filter(|jwt| !jwt.trim().is_empty())
            .ok_or_else(|| ApiError::ValidationFailed("Missing jwt parameter".into()))?;

        let outcome = state.verifier.verify(&token)?;

        Ok(Json(VerifyVcResponse {
            success: true,
            valid: outcome.valid,
            expired: outcome.expired,
            payload: outcome.payload,
        }))
    }
}
