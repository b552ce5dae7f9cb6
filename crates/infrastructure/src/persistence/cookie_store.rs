//! File-based cookie store.
//!
//! The whole jar is one JSON array, loaded and saved wholesale. A
//! missing file is an empty jar.

use std::path::PathBuf;

use async_trait::async_trait;
use waypoint_application::{CookieStore, StoreError};
use waypoint_domain::Cookie;

/// Persists the cookie jar as a single JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileCookieStore {
    path: PathBuf,
}

impl JsonFileCookieStore {
    /// Creates a store over the given file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CookieStore for JsonFileCookieStore {
    async fn load_all(&self) -> Result<Vec<Cookie>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::Io(e.to_string())),
        };
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    async fn save_all(&self, cookies: &[Cookie]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Io(e.to_string()))?;
        }
        let bytes = serde_json::to_vec_pretty(cookies)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn test_missing_file_is_an_empty_jar() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileCookieStore::new(dir.path().join("cookies.json"));
        assert_eq!(store.load_all().await.unwrap(), vec![]);
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileCookieStore::new(dir.path().join("nested").join("cookies.json"));

        let cookies = vec![
            Cookie::new("session", "abc", "api.example.com"),
            Cookie::new("theme", "dark", "example.com").with_enabled(false),
        ];
        store.save_all(&cookies).await.unwrap();
        assert_eq!(store.load_all().await.unwrap(), cookies);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_a_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        tokio::fs::write(&path, b"not json").await.unwrap();

        let store = JsonFileCookieStore::new(path);
        assert!(matches!(
            store.load_all().await,
            Err(StoreError::Serialization(_))
        ));
    }
}
