pub mod api_error;
pub mod api_server;
pub mod credential_issuer;
pub mod session_manager;
pub mod signature_verifier;
pub mod verifier;
