// src/services/api_error.rs
//! API error types and responses.
//!
//! Every failure leaves the server as `{"success": false, "error": "..."}`.
//! Internal faults are logged and answered with a generic message.

use crate::error::IdentityError;
use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::error;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Malformed input shape or out-of-range values
    #[error("{0}")]
    ValidationFailed(String),

    /// Bad or missing session token, failed signature, unknown challenge
    #[error("{0}")]
    AuthenticationFailed(String),

    /// Authenticated, but acting outside the permitted scope
    #[error("{0}")]
    AuthorizationFailed(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Internal server error")]
    Internal(String),
}

/// Uniform error body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            ApiError::AuthenticationFailed(_) => StatusCode::UNAUTHORIZED,
            ApiError::AuthorizationFailed(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            error!("Internal error: {}", detail);
        }

        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
        };

        (self.status(), Json(body)).into_response()
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::InvalidFormat(_)
            | IdentityError::ValidationFailed(_)
            | IdentityError::MalformedToken(_) => ApiError::ValidationFailed(err.to_string()),

            IdentityError::ChallengeNotFound
            | IdentityError::SignatureInvalid
            | IdentityError::NoSessionToken
            | IdentityError::InvalidSessionToken => ApiError::AuthenticationFailed(err.to_string()),

            IdentityError::SubjectMismatch => ApiError::AuthorizationFailed(err.to_string()),

            IdentityError::InvalidKey(_) | IdentityError::Signing(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::ValidationFailed(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::ValidationFailed(format!("Invalid query: {}", rejection.body_text()))
    }
}
