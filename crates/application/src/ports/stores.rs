//! Storage ports for stored credentials, proxies, certificates and
//! cookies.

use async_trait::async_trait;
use thiserror::Error;
use waypoint_domain::{AuthEntry, CertEntry, Cookie, ProxyEntry};

/// Failures raised by storage adapters.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The underlying storage could not be read or written.
    #[error("storage I/O error: {0}")]
    Io(String),
    /// The stored payload could not be parsed or encoded.
    #[error("storage serialization error: {0}")]
    Serialization(String),
}

/// Read access to the stored network configuration.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// All stored credential entries.
    async fn load_auths(&self) -> Result<Vec<AuthEntry>, StoreError>;

    /// All stored proxy entries.
    async fn load_proxies(&self) -> Result<Vec<ProxyEntry>, StoreError>;

    /// All stored certificate entries.
    async fn load_certs(&self) -> Result<Vec<CertEntry>, StoreError>;
}

/// Wholesale persistence for the cookie jar.
#[async_trait]
pub trait CookieStore: Send + Sync {
    /// Loads the full cookie list.
    async fn load_all(&self) -> Result<Vec<Cookie>, StoreError>;

    /// Replaces the full cookie list.
    async fn save_all(&self, cookies: &[Cookie]) -> Result<(), StoreError>;
}
