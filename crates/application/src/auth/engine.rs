//! Strategy dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use waypoint_domain::{AuthEntry, AuthError, AuthScheme};

use crate::ports::{CancellationToken, HttpTransport, TransportRequest};

use super::api_key::ApiKeyStrategy;
use super::basic::BasicStrategy;
use super::cache::AuthCache;
use super::digest::DigestStrategy;
use super::oauth2::OAuth2RefreshStrategy;
use super::{AuthContext, AuthOutcome, AuthStrategy as _};

/// Applies stored credentials to outgoing requests.
///
/// One instance per executor; strategy instances and the shared
/// [`AuthCache`] live as long as the engine, so Digest nonce state and
/// `OAuth2` tokens survive across requests.
pub struct AuthEngine {
    cache: Arc<AuthCache>,
    api_key: ApiKeyStrategy,
    basic: BasicStrategy,
    digest: DigestStrategy,
    oauth2: OAuth2RefreshStrategy,
}

impl AuthEngine {
    /// Creates an engine with a fresh cache.
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self::with_cache(transport, Arc::new(AuthCache::new()))
    }

    /// Creates an engine over an existing cache.
    #[must_use]
    pub fn with_cache(transport: Arc<dyn HttpTransport>, cache: Arc<AuthCache>) -> Self {
        Self {
            api_key: ApiKeyStrategy,
            basic: BasicStrategy,
            digest: DigestStrategy::new(transport.clone(), cache.clone()),
            oauth2: OAuth2RefreshStrategy::new(transport, cache.clone()),
            cache,
        }
    }

    /// The shared per-credential state cache.
    #[must_use]
    pub fn cache(&self) -> &AuthCache {
        &self.cache
    }

    /// Applies `entry` to the prepared request, dispatching on its
    /// scheme.
    pub async fn apply_auth(
        &self,
        entry: &AuthEntry,
        request: &TransportRequest,
        env_vars: &HashMap<String, String>,
        cancel: &CancellationToken,
    ) -> Result<AuthOutcome, AuthError> {
        let ctx = AuthContext {
            entry,
            request,
            env_vars,
            cancel,
        };
        match &entry.scheme {
            AuthScheme::ApiKey { .. } => self.api_key.apply_auth(&ctx).await,
            AuthScheme::Basic { .. } => self.basic.apply_auth(&ctx).await,
            AuthScheme::Digest { .. } => self.digest.apply_auth(&ctx).await,
            AuthScheme::OAuth2Refresh { .. } => self.oauth2.apply_auth(&ctx).await,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use pretty_assertions::assert_eq;
    use waypoint_domain::HttpMethod;

    use crate::test_support::{ScriptedTransport, ok_body};

    use super::*;

    #[tokio::test]
    async fn test_dispatches_by_scheme() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_response(ok_body(r#"{"access_token":"tok","expires_in":60}"#));
        let engine = AuthEngine::new(transport);

        let basic = AuthEntry::new(
            "b",
            AuthScheme::Basic {
                username: "u".to_string(),
                password: "p".to_string(),
            },
        );
        let oauth = AuthEntry::new(
            "o",
            AuthScheme::OAuth2Refresh {
                token_url: "https://auth.example.com/token".to_string(),
                client_id: "c".to_string(),
                client_secret: None,
                refresh_token: "r".to_string(),
                scope: None,
            },
        );

        let request = TransportRequest::new(HttpMethod::Get, "https://api.example.com");
        let env = HashMap::new();
        let cancel = CancellationToken::new();

        let outcome = engine
            .apply_auth(&basic, &request, &env, &cancel)
            .await
            .unwrap();
        let AuthOutcome::Augment { headers, .. } = outcome else {
            panic!("expected augment outcome");
        };
        assert!(headers[0].1.starts_with("Basic "));

        let outcome = engine
            .apply_auth(&oauth, &request, &env, &cancel)
            .await
            .unwrap();
        let AuthOutcome::Augment { headers, .. } = outcome else {
            panic!("expected augment outcome");
        };
        assert_eq!(headers[0].1, "Bearer tok");
    }
}
