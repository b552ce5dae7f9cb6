//! Per-credential authentication state shared across requests.
//!
//! The cache keys everything by credential id and lives for the
//! lifetime of the engine: Digest nonce state, OAuth2 access tokens,
//! and the per-credential locks that serialize nonce counting and
//! coalesce concurrent token refreshes.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Mutex, RwLock};

/// Cached Digest challenge state for one credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestState {
    /// Protection realm from the challenge.
    pub realm: String,
    /// Server nonce.
    pub nonce: String,
    /// Next nonce count to use with this nonce.
    pub nc: u32,
    /// Opaque value to echo back, if the server sent one.
    pub opaque: Option<String>,
    /// Algorithm token from the challenge (e.g. `MD5`, `SHA-256-sess`).
    pub algorithm: Option<String>,
    /// Quality-of-protection token negotiated for responses.
    pub qop: Option<String>,
}

/// A cached OAuth2 access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedToken {
    /// The bearer token value.
    pub access_token: String,
    /// Absolute expiry; `None` when the provider sent no lifetime.
    pub expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    /// Returns true when the token is expired or expires within
    /// `skew_seconds`.
    #[must_use]
    pub fn is_expiring(&self, skew_seconds: i64) -> bool {
        self.expires_at
            .is_some_and(|at| at <= Utc::now() + Duration::seconds(skew_seconds))
    }
}

/// Thread-safe authentication state keyed by credential id.
#[derive(Debug, Default)]
pub struct AuthCache {
    digest: RwLock<HashMap<String, DigestState>>,
    tokens: RwLock<HashMap<String, CachedToken>>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AuthCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The per-credential lock. Digest holds it across an exchange to
    /// keep nonce counts monotonic; OAuth2 holds it across a refresh so
    /// concurrent callers coalesce onto one token request.
    pub async fn entry_lock(&self, credential_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(credential_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Takes one use of the cached nonce: returns the state carrying
    /// the nonce count to send and stores the incremented count.
    pub async fn consume_digest_nonce(&self, credential_id: &str) -> Option<DigestState> {
        let mut states = self.digest.write().await;
        let state = states.get_mut(credential_id)?;
        let used = state.clone();
        state.nc = state.nc.saturating_add(1);
        Some(used)
    }

    /// Stores fresh challenge state for a credential.
    pub async fn store_digest(&self, credential_id: &str, state: DigestState) {
        self.digest
            .write()
            .await
            .insert(credential_id.to_string(), state);
    }

    /// Drops the cached challenge state for a credential.
    pub async fn clear_digest(&self, credential_id: &str) {
        self.digest.write().await.remove(credential_id);
    }

    /// The cached access token for a credential, if any.
    pub async fn token(&self, credential_id: &str) -> Option<CachedToken> {
        self.tokens.read().await.get(credential_id).cloned()
    }

    /// Stores a refreshed access token.
    pub async fn store_token(&self, credential_id: &str, token: CachedToken) {
        self.tokens
            .write()
            .await
            .insert(credential_id.to_string(), token);
    }

    /// Drops the cached token for a credential.
    pub async fn clear_token(&self, credential_id: &str) {
        self.tokens.write().await.remove(credential_id);
    }

    /// Drops all cached state, for every credential.
    pub async fn clear_all(&self) {
        self.digest.write().await.clear();
        self.tokens.write().await.clear();
    }
}
