//! File-based network configuration store.
//!
//! Credentials, proxies and certificates live together in one JSON
//! document. A missing file yields empty lists.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use waypoint_application::{ConfigStore, StoreError};
use waypoint_domain::{AuthEntry, CertEntry, ProxyEntry};

/// The on-disk configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigDocument {
    /// Stored credential entries.
    #[serde(default)]
    pub auths: Vec<AuthEntry>,
    /// Stored proxy entries.
    #[serde(default)]
    pub proxies: Vec<ProxyEntry>,
    /// Stored certificate entries.
    #[serde(default)]
    pub certs: Vec<CertEntry>,
}

/// Reads network configuration from a single JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileConfigStore {
    path: PathBuf,
}

impl JsonFileConfigStore {
    /// Creates a store over the given file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Loads the full document; a missing file is an empty document.
    pub async fn load(&self) -> Result<ConfigDocument, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ConfigDocument::default());
            }
            Err(e) => return Err(StoreError::Io(e.to_string())),
        };
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Replaces the full document.
    pub async fn save(&self, document: &ConfigDocument) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Io(e.to_string()))?;
        }
        let bytes = serde_json::to_vec_pretty(document)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))
    }
}

#[async_trait]
impl ConfigStore for JsonFileConfigStore {
    async fn load_auths(&self) -> Result<Vec<AuthEntry>, StoreError> {
        Ok(self.load().await?.auths)
    }

    async fn load_proxies(&self) -> Result<Vec<ProxyEntry>, StoreError> {
        Ok(self.load().await?.proxies)
    }

    async fn load_certs(&self) -> Result<Vec<CertEntry>, StoreError> {
        Ok(self.load().await?.certs)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use pretty_assertions::assert_eq;
    use waypoint_domain::AuthScheme;

    use super::*;

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileConfigStore::new(dir.path().join("config.json"));
        assert!(store.load_auths().await.unwrap().is_empty());
        assert!(store.load_proxies().await.unwrap().is_empty());
        assert!(store.load_certs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileConfigStore::new(dir.path().join("config.json"));

        let document = ConfigDocument {
            auths: vec![AuthEntry::new(
                "staging",
                AuthScheme::Basic {
                    username: "u".to_string(),
                    password: "p".to_string(),
                },
            )],
            proxies: vec![ProxyEntry::new("proxy.local").with_port(3128)],
            certs: vec![CertEntry::ca("/certs/ca.pem")],
        };
        store.save(&document).await.unwrap();

        assert_eq!(store.load_auths().await.unwrap(), document.auths);
        assert_eq!(store.load_proxies().await.unwrap(), document.proxies);
        assert_eq!(store.load_certs().await.unwrap(), document.certs);
    }

    #[tokio::test]
    async fn test_partial_document_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        tokio::fs::write(&path, br#"{"proxies": []}"#).await.unwrap();

        let store = JsonFileConfigStore::new(path);
        assert!(store.load_auths().await.unwrap().is_empty());
        assert!(store.load_certs().await.unwrap().is_empty());
    }
}
