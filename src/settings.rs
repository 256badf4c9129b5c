// src/settings.rs
//! Service configuration.
//!
//! Values are layered, later sources winning:
//! 1. Built-in defaults
//! 2. Optional `did-auth.{toml,json,yaml}` in the working directory
//! 3. Environment variables (a `.env` file is loaded first by `main`)
//!
//! ## Settings
//! - `ISSUER_DID`: DID written into every credential's `iss` claim (required)
//! - `ISSUER_PRIVATE_KEY`: hex secp256k1 key signing credentials (required)
//! - `SESSION_SECRET`: HMAC secret for session tokens (required)
//! - `BIND_ADDR`: listen address (default `127.0.0.1:3000`)
//! - `CHALLENGE_PURGE_INTERVAL_SECS`: sweep period for expired challenges (default 60)

use crate::models::did::Did;
use crate::wallet::key_management::KeyManager;
use config::{Config, ConfigError, Environment, File};
use log::warn;
use serde::Deserialize;
use std::net::SocketAddr;
use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_PURGE_INTERVAL_SECS: u64 = 60;
const MIN_SESSION_SECRET_LEN: usize = 32;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{0} is invalid: {1}")]
    Invalid(&'static str, String),
}

/// Raw values as read from the configuration sources.
#[derive(Debug, Deserialize)]
struct RawSettings {
    issuer_did: Option<String>,
    issuer_private_key: Option<String>,
    session_secret: Option<String>,
    bind_addr: String,
    challenge_purge_interval_secs: u64,
}

/// Validated configuration, ready to build the services from.
pub struct Settings {
    pub issuer_did: Did,
    pub issuer_key: KeyManager,
    pub session_secret: String,
    pub bind_addr: SocketAddr,
    pub challenge_purge_interval_secs: u64,
}

impl Settings {
    /// Loads settings from defaults, the optional config file and the
    /// environment.
    pub fn load() -> Result<Self, SettingsError> {
        let raw: RawSettings = Config::builder()
            .set_default("bind_addr", DEFAULT_BIND_ADDR)?
            .set_default("challenge_purge_interval_secs", DEFAULT_PURGE_INTERVAL_SECS as i64)?
            .add_source(File::with_name("did-auth").required(false))
            .add_source(Environment::default())
            .build()?
            .try_deserialize()?;

        Self::from_raw(raw)
    }

    fn from_raw(raw: RawSettings) -> Result<Self, SettingsError> {
        let issuer_did = required(raw.issuer_did, "ISSUER_DID")?;
        let issuer_private_key = required(raw.issuer_private_key, "ISSUER_PRIVATE_KEY")?;
        let session_secret = required(raw.session_secret, "SESSION_SECRET")?;

        let issuer_did = Did::parse(&issuer_did)
            .map_err(|e| SettingsError::Invalid("ISSUER_DID", e.to_string()))?;
        let issuer_key = KeyManager::from_hex(&issuer_private_key)
            .map_err(|e| SettingsError::Invalid("ISSUER_PRIVATE_KEY", e.to_string()))?;

        if session_secret.trim() == issuer_private_key.trim() {
            return Err(SettingsError::Invalid(
                "SESSION_SECRET",
                "must differ from ISSUER_PRIVATE_KEY".into(),
            ));
        }
        if session_secret.len() < MIN_SESSION_SECRET_LEN {
            warn!(
                "SESSION_SECRET is shorter than {} bytes; use a longer random value",
                MIN_SESSION_SECRET_LEN
            );
        }

        if !issuer_did.matches_account(&issuer_key.address()) {
            warn!(
                "ISSUER_DID account {} does not match the issuer key address {}",
                issuer_did.account(),
                issuer_key.address()
            );
        }

        let bind_addr = raw
            .bind_addr
            .parse()
            .map_err(|e: std::net::AddrParseError| SettingsError::Invalid("BIND_ADDR", e.to_string()))?;

        if raw.challenge_purge_interval_secs == 0 {
            return Err(SettingsError::Invalid(
                "CHALLENGE_PURGE_INTERVAL_SECS",
                "must be greater than zero".into(),
            ));
        }

        Ok(Settings {
            issuer_did,
            issuer_key,
            session_secret,
            bind_addr,
            challenge_purge_interval_secs: raw.challenge_purge_interval_secs,
        })
    }
}

fn required(value: Option<String>, name: &'static str) -> Result<String, SettingsError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(SettingsError::Missing(name))
}
