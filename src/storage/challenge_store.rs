// src/storage/challenge_store.rs
//! Single-use challenge storage.
//!
//! A challenge is a random nonce bound to one DID. The store keeps at most one
//! live challenge per DID, overwrites it on re-issue, and removes it on the
//! first verification attempt regardless of outcome.
//!
//! Persistence goes through the [`ChallengeBackend`] trait so the in-memory
//! map can be swapped for a shared cache when the service runs as several
//! instances. Both backend operations are atomic per key.

use crate::error::IdentityError;
use crate::models::did::Did;
use crate::utils::crypto::{constant_time_eq, generate_nonce};
use chrono::Utc;
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Seconds a challenge stays valid after issuance
pub const CHALLENGE_TTL_SECS: i64 = 300;

/// A stored challenge record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    /// Normalized DID the nonce was issued to
    pub did: String,
    pub nonce: String,
    /// Unix seconds
    pub issued_at: i64,
    /// Unix seconds
    pub expires_at: i64,
}

impl Challenge {
    pub fn is_expired(&self, now: i64) -> bool {
        now > self.expires_at
    }
}

/// Result of a successful `generate` call.
#[derive(Debug, Clone)]
pub struct IssuedChallenge {
    pub challenge: String,
    pub expires_in: i64,
}

/// Key-value persistence for challenges.
pub trait ChallengeBackend: Send + Sync {
    /// Stores `challenge` under its DID, replacing any existing entry.
    fn put(&self, challenge: Challenge);

    /// Removes and returns the entry for `did` in one atomic step.
    fn take(&self, did: &str) -> Option<Challenge>;

    /// Drops every entry expired at `now`, returning how many were removed.
    fn purge_expired(&self, now: i64) -> usize;

    fn len(&self) -> usize;
}

/// In-memory challenge map guarded by a single mutex.
///
/// Suitable for single-instance deployments. Data is lost on restart, which
/// only forces clients to request a fresh challenge.
#[derive(Debug, Default)]
pub struct MemoryChallengeBackend {
    challenges: Mutex<HashMap<String, Challenge>>,
}

impl MemoryChallengeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Challenge>> {
        // The map holds no invariant a panicking writer could break half-way.
        self.challenges.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ChallengeBackend for MemoryChallengeBackend {
    fn put(&self, challenge: Challenge) {
        self.entries().insert(challenge.did.clone(), challenge);
    }

    fn take(&self, did: &str) -> Option<Challenge> {
        self.entries().remove(did)
    }

    fn purge_expired(&self, now: i64) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, challenge| !challenge.is_expired(now));
        before - entries.len()
    }

    fn len(&self) -> usize {
        self.entries().len()
    }
}

/// Issues and consumes challenges on top of a [`ChallengeBackend`].
#[derive(Clone)]
pub struct ChallengeStore {
    backend: Arc<dyn ChallengeBackend>,
}

impl ChallengeStore {
    pub fn new(backend: Arc<dyn ChallengeBackend>) -> Self {
        Self { backend }
    }

    /// Store backed by [`MemoryChallengeBackend`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryChallengeBackend::new()))
    }

    /// Issues a fresh challenge for `did`.
    ///
    /// # Errors
    /// `IdentityError::InvalidFormat` for a malformed DID. The backend is not
    /// touched in that case.
    pub fn generate(&self, did: &str) -> Result<IssuedChallenge, IdentityError> {
        self.generate_at(did, Utc::now().timestamp())
    }

    fn generate_at(&self, did: &str, now: i64) -> Result<IssuedChallenge, IdentityError> {
        let did = Did::parse(did)?;
        let nonce = generate_nonce();

        self.backend.put(Challenge {
            did: did.to_string(),
            nonce: nonce.clone(),
            issued_at: now,
            expires_at: now + CHALLENGE_TTL_SECS,
        });
        debug!("Issued challenge for {}", did);

        Ok(IssuedChallenge {
            challenge: nonce,
            expires_in: CHALLENGE_TTL_SECS,
        })
    }

    /// Consumes the challenge for `did`, succeeding only if it is live and
    /// `nonce` matches.
    ///
    /// The stored entry is deleted whatever the outcome. Missing, expired and
    /// mismatched challenges all fail with `IdentityError::ChallengeNotFound`.
    pub fn consume(&self, did: &Did, nonce: &str) -> Result<(), IdentityError> {
        self.consume_at(did, nonce, Utc::now().timestamp())
    }

    fn consume_at(&self, did: &Did, nonce: &str, now: i64) -> Result<(), IdentityError> {
        let stored = self
            .backend
            .take(&did.to_string())
            .ok_or(IdentityError::ChallengeNotFound)?;

        if stored.is_expired(now) || !constant_time_eq(&stored.nonce, nonce) {
            return Err(IdentityError::ChallengeNotFound);
        }

        Ok(())
    }

    /// Removes expired challenges. Lookups already treat them as absent; this
    /// only bounds memory held by abandoned challenges.
    pub fn purge_expired(&self) -> usize {
        self.backend.purge_expired(Utc::now().timestamp())
    }

    pub fn len(&self) -> usize {
        self.backend.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DID: &str = "did:pkh:eip155:31337:0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

    fn did() -> Did {
        Did::parse(DID).unwrap()
    }

    #[test]
    fn test_generate_returns_fresh_nonces() {
        let store = ChallengeStore::in_memory();

        let first = store.generate(DID).unwrap();
        let second = store.generate(DID).unwrap();

        assert_ne!(first.challenge, second.challenge);
        assert_eq!(first.expires_in, 300);
        assert_eq!(second.expires_in, 300);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_generate_rejects_malformed_did_without_storing() {
        let store = ChallengeStore::in_memory();

        let result = store.generate("did:example:123");

        assert!(matches!(result, Err(IdentityError::InvalidFormat(_))));
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_consume_is_single_use() {
        let store = ChallengeStore::in_memory();
        let issued = store.generate(DID).unwrap();

        assert!(store.consume(&did(), &issued.challenge).is_ok());
        assert_eq!(
            store.consume(&did(), &issued.challenge),
            Err(IdentityError::ChallengeNotFound)
        );
    }

    #[test]
    fn test_wrong_nonce_burns_the_challenge() {
        let store = ChallengeStore::in_memory();
        let issued = store.generate(DID).unwrap();

        assert_eq!(store.consume(&did(), "wrong"), Err(IdentityError::ChallengeNotFound));
        // The correct nonce no longer works either.
        assert_eq!(
            store.consume(&did(), &issued.challenge),
            Err(IdentityError::ChallengeNotFound)
        );
    }

    #[test]
    fn test_reissue_overwrites_previous_nonce() {
        let store = ChallengeStore::in_memory();
        let _old = store.generate(DID).unwrap();
        let new = store.generate(DID).unwrap();
        assert!(store.consume(&did(), &new.challenge).is_ok());

        let old = store.generate(DID).unwrap();
        let _new = store.generate(DID).unwrap();
        assert_eq!(store.consume(&did(), &old.challenge), Err(IdentityError::ChallengeNotFound));
    }

    #[test]
    fn test_expired_challenge_is_not_found() {
        let store = ChallengeStore::in_memory();
        let now = Utc::now().timestamp();
        let issued = store.generate_at(DID, now - CHALLENGE_TTL_SECS - 1).unwrap();

        assert_eq!(
            store.consume_at(&did(), &issued.challenge, now),
            Err(IdentityError::ChallengeNotFound)
        );
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_never_issued_challenge_is_not_found() {
        let store = ChallengeStore::in_memory();
        assert_eq!(store.consume(&did(), "anything"), Err(IdentityError::ChallengeNotFound));
    }

    #[test]
    fn test_lookup_is_case_insensitive_on_account() {
        let store = ChallengeStore::in_memory();
        let issued = store
            .generate("did:pkh:eip155:31337:0xF39FD6E51AAD88F6F4CE6AB8827279CFFFB92266")
            .unwrap();

        assert!(store.consume(&did(), &issued.challenge).is_ok());
    }

    #[test]
    fn test_concurrent_consumers_get_exactly_one_success() {
        const THREADS: usize = 8;
        let store = ChallengeStore::in_memory();

        for round in 0..50 {
            let issued = store.generate(DID).unwrap();
            let barrier = std::sync::Barrier::new(THREADS);

            let successes = std::thread::scope(|scope| {
                let handles: Vec<_> = (0..THREADS)
                    .map(|_| {
                        let store = store.clone();
                        let barrier = &barrier;
                        let nonce = issued.challenge.as_str();
                        scope.spawn(move || {
                            barrier.wait();
                            store.consume(&did(), nonce).is_ok()
                        })
                    })
                    .collect();

                handles
                    .into_iter()
                    .map(|handle| handle.join().unwrap())
                    .filter(|consumed| *consumed)
                    .count()
            });

            assert_eq!(successes, 1, "round {}", round);
            assert_eq!(store.len(), 0);
        }
    }

    #[test]
    fn test_purge_removes_only_expired_entries() {
        let backend = MemoryChallengeBackend::new();
        let now = Utc::now().timestamp();
        backend.put(Challenge {
            did: "stale".into(),
            nonce: "a".into(),
            issued_at: now - 400,
            expires_at: now - 100,
        });
        backend.put(Challenge {
            did: "live".into(),
            nonce: "b".into(),
            issued_at: now,
            expires_at: now + 300,
        });

        assert_eq!(backend.purge_expired(now), 1);
        assert_eq!(backend.len(), 1);
        assert!(backend.take("live").is_some());
    }
}
