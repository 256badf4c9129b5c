// src/main.rs

//! # DID Authentication Service - Main Entry Point
//!
//! Initializes the authentication and credential components and starts the
//! API server.
//!
//! ## Architecture Overview
//! 1. **Storage Layer**: `ChallengeStore` for single-use challenge nonces
//! 2. **Services Layer**: Signature verification, sessions, credential
//!    issuance and verification, HTTP API
//! 3. **Cryptography Layer**: Issuer key custody and token encoding
//!
//! ## Environment Variables Required
//! - `ISSUER_DID`: DID of this credential issuer
//! - `ISSUER_PRIVATE_KEY`: Hex secp256k1 key signing credentials
//! - `SESSION_SECRET`: Secret signing session tokens
//! - `BIND_ADDR`: (Optional) Listen address (default: 127.0.0.1:3000)
//!
//! The process exits with a non-zero status if any required value is missing
//! or invalid.

use crate::services::api_server::ApiServer;
use crate::services::credential_issuer::CredentialIssuer;
use crate::services::session_manager::SessionManager;
use crate::settings::Settings;
use crate::storage::challenge_store::ChallengeStore;
use anyhow::Context;
use dotenv::dotenv;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;

// Module declarations (organized by functional domain)
mod error;         // Domain error kinds
mod models;        // Data structures
mod services;      // Business logic and API
mod settings;      // Startup configuration
mod storage;       // Challenge storage
mod utils;         // Helper functions
mod wallet;        // Issuer key custody

#[cfg(test)]
mod test_support;

/// Main application entry point
///
/// # Initialization Sequence
/// 1. Load environment configuration
/// 2. Initialize service components
/// 3. Start the expired-challenge sweeper
/// 4. Serve until Ctrl-C
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::load().context("refusing to start")?;

    let key_manager = Arc::new(settings.issuer_key);
    let challenge_store = ChallengeStore::in_memory();
    let session_manager = SessionManager::new(settings.session_secret.as_bytes());
    let credential_issuer = CredentialIssuer::new(settings.issuer_did.to_string(), key_manager.clone());

    info!(
        "Issuing credentials as {} on chain {} (key address {})",
        settings.issuer_did,
        settings.issuer_did.chain_id(),
        key_manager.address()
    );

    spawn_challenge_sweeper(
        challenge_store.clone(),
        Duration::from_secs(settings.challenge_purge_interval_secs),
    );

    let api_server = ApiServer::new(challenge_store, session_manager, credential_issuer, key_manager);

    info!("Available endpoints:");
    info!("- GET  /challenge?did=<did>");
    info!("- POST /verify-challenge");
    info!("- POST /issue-vc");
    info!("- GET  /verify-vc?jwt=<token>");
    info!("- GET  /issuer");

    api_server
        .run(settings.bind_addr, shutdown_signal())
        .await
        .with_context(|| format!("API server on {} failed", settings.bind_addr))?;

    info!("API server stopped");
    Ok(())
}

/// Periodically drops expired challenges from the store.
fn spawn_challenge_sweeper(store: ChallengeStore, period: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let purged = store.purge_expired();
            if purged > 0 {
                debug!("Purged {} expired challenges, {} live", purged, store.len());
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
