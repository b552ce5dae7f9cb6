//! The cookie jar service.
//!
//! Sits between the executor and the persisted cookie list: it renders
//! the `Cookie` header for an outgoing request and folds `Set-Cookie`
//! response headers back into the store. The load-merge-save sequence
//! runs under a lock so concurrent responses cannot drop each other's
//! cookies.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::warn;
use url::Url;
use waypoint_domain::{Cookie, cookie_header, merge_cookies};

use crate::ports::CookieStore;

/// Stateless cookie jar over a wholesale [`CookieStore`].
pub struct CookieJar {
    store: Arc<dyn CookieStore>,
    write_lock: Mutex<()>,
}

impl CookieJar {
    /// Creates a jar over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn CookieStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// The `Cookie` header value for a request URL; empty when no
    /// stored cookie applies.
    pub async fn header_for_url(&self, url: &str) -> String {
        match self.store.load_all().await {
            Ok(cookies) => cookie_header(&cookies, url),
            Err(error) => {
                warn!(%error, "could not load cookies, sending none");
                String::new()
            }
        }
    }

    /// The full stored cookie list, disabled and expired entries
    /// included.
    pub async fn snapshot(&self) -> Vec<Cookie> {
        match self.store.load_all().await {
            Ok(cookies) => cookies,
            Err(error) => {
                warn!(%error, "could not load cookies");
                Vec::new()
            }
        }
    }

    /// Parses every `Set-Cookie` header, merges the results into the
    /// store, and returns the cookies that were stored or updated.
    ///
    /// Unparseable headers are skipped. The default cookie domain is
    /// the request host.
    pub async fn apply_set_cookies(&self, headers: &[(String, String)], url: &str) -> Vec<Cookie> {
        let default_domain = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();

        let incoming: Vec<Cookie> = headers
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case("set-cookie"))
            .filter_map(|(_, value)| Cookie::parse_set_cookie(value, &default_domain))
            .collect();
        if incoming.is_empty() {
            return Vec::new();
        }

        let _guard = self.write_lock.lock().await;
        let existing = match self.store.load_all().await {
            Ok(cookies) => cookies,
            Err(error) => {
                warn!(%error, "could not load cookies before merge, starting empty");
                Vec::new()
            }
        };
        let merged = merge_cookies(existing, incoming.clone());
        if let Err(error) = self.store.save_all(&merged).await {
            warn!(%error, "could not persist cookies");
        }
        incoming
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use tokio::sync::RwLock;

    use crate::ports::StoreError;

    use super::*;

    #[derive(Default)]
    struct InMemoryCookieStore {
        cookies: RwLock<Vec<Cookie>>,
    }

    #[async_trait]
    impl CookieStore for InMemoryCookieStore {
        async fn load_all(&self) -> Result<Vec<Cookie>, StoreError> {
            Ok(self.cookies.read().await.clone())
        }

        async fn save_all(&self, cookies: &[Cookie]) -> Result<(), StoreError> {
            *self.cookies.write().await = cookies.to_vec();
            Ok(())
        }
    }

    fn set_cookie(value: &str) -> (String, String) {
        ("set-cookie".to_string(), value.to_string())
    }

    #[tokio::test]
    async fn test_new_cookies_are_stored_and_returned() {
        let store = Arc::new(InMemoryCookieStore::default());
        let jar = CookieJar::new(store.clone());

        let stored = jar
            .apply_set_cookies(
                &[set_cookie("session=abc; Path=/"), set_cookie("junk")],
                "https://api.example.com/login",
            )
            .await;

        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].name, "session");
        assert_eq!(stored[0].domain, "api.example.com");
        assert_eq!(store.cookies.read().await.len(), 1);
    }

    #[tokio::test]
    async fn test_header_for_matching_url() {
        let store = Arc::new(InMemoryCookieStore::default());
        store
            .save_all(&[Cookie::new("session", "abc", "api.example.com")])
            .await
            .unwrap();
        let jar = CookieJar::new(store);

        assert_eq!(
            jar.header_for_url("https://api.example.com/v1").await,
            "session=abc"
        );
        assert_eq!(jar.header_for_url("https://other.com/").await, "");
    }

    #[tokio::test]
    async fn test_incoming_cookie_replaces_existing() {
        let store = Arc::new(InMemoryCookieStore::default());
        store
            .save_all(&[Cookie::new("session", "old", "api.example.com")])
            .await
            .unwrap();
        let jar = CookieJar::new(store.clone());

        jar.apply_set_cookies(&[set_cookie("session=new")], "https://api.example.com/")
            .await;

        let cookies = store.cookies.read().await;
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].value, "new");
    }

    #[tokio::test]
    async fn test_snapshot_includes_disabled_cookies() {
        let store = Arc::new(InMemoryCookieStore::default());
        store
            .save_all(&[Cookie::new("a", "1", "example.com").with_enabled(false)])
            .await
            .unwrap();
        let jar = CookieJar::new(store);
        assert_eq!(jar.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn test_no_set_cookie_headers_is_a_no_op() {
        let store = Arc::new(InMemoryCookieStore::default());
        let jar = CookieJar::new(store.clone());

        let stored = jar
            .apply_set_cookies(
                &[("content-type".to_string(), "text/html".to_string())],
                "https://api.example.com/",
            )
            .await;

        assert!(stored.is_empty());
        assert!(store.cookies.read().await.is_empty());
    }
}
