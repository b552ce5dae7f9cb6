//! `OAuth2` refresh-token strategy.
//!
//! Exchanges a long-lived refresh token for a bearer access token at
//! the credential's token endpoint, caches the token until shortly
//! before it expires, and coalesces concurrent refreshes for the same
//! credential onto a single token request.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Deserialize;
use tracing::debug;
use waypoint_domain::{AuthError, AuthScheme, HttpMethod};

use crate::placeholder::PlaceholderResolver;
use crate::ports::{HttpTransport, TransportRequest};

use super::cache::{AuthCache, CachedToken};
use super::{AuthContext, AuthOutcome, AuthStrategy};

/// Tokens expiring within this window are refreshed eagerly.
const EXPIRY_SKEW_SECONDS: i64 = 60;

/// Refreshes and caches `OAuth2` access tokens.
pub struct OAuth2RefreshStrategy {
    transport: Arc<dyn HttpTransport>,
    cache: Arc<AuthCache>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

impl OAuth2RefreshStrategy {
    /// Creates the strategy over the shared transport and cache.
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>, cache: Arc<AuthCache>) -> Self {
        Self { transport, cache }
    }

    async fn refresh(
        &self,
        ctx: &AuthContext<'_>,
        grant: &RefreshGrant,
    ) -> Result<CachedToken, AuthError> {
        let mut form = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", grant.refresh_token.as_str()),
            ("client_id", grant.client_id.as_str()),
        ];
        if let Some(secret) = &grant.client_secret {
            form.push(("client_secret", secret.as_str()));
        }
        if let Some(scope) = &grant.scope {
            form.push(("scope", scope.as_str()));
        }
        let body = serde_urlencoded::to_string(&form)
            .map_err(|e| AuthError::TokenRefresh(format!("could not encode token request: {e}")))?;

        let request = TransportRequest {
            method: HttpMethod::Post,
            url: grant.token_url.clone(),
            headers: vec![(
                "Content-Type".to_string(),
                "application/x-www-form-urlencoded".to_string(),
            )],
            body: Some(body),
            proxy: None,
            tls: None,
            timeout_ms: ctx.request.timeout_ms,
            max_redirects: 0,
        };

        let response = self
            .transport
            .perform(request, ctx.cancel.clone())
            .await
            .map_err(|e| AuthError::TokenRefresh(format!("token endpoint unreachable: {e}")))?;

        if !response.is_success() {
            let body = String::from_utf8_lossy(&response.body);
            let message = serde_json::from_str::<TokenErrorResponse>(&body).map_or_else(
                |_| format!("token endpoint returned {}", response.status),
                |err| match err.error_description {
                    Some(description) => format!("{}: {description}", err.error),
                    None => err.error,
                },
            );
            return Err(AuthError::TokenRefresh(message));
        }

        let token: TokenResponse = serde_json::from_slice(&response.body)
            .map_err(|e| AuthError::TokenRefresh(format!("malformed token response: {e}")))?;
        if token.access_token.is_empty() {
            return Err(AuthError::TokenRefresh(
                "token response is missing access_token".to_string(),
            ));
        }

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: token
                .expires_in
                .map(|secs| Utc::now() + Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX))),
        })
    }
}

#[async_trait]
impl AuthStrategy for OAuth2RefreshStrategy {
    async fn apply_auth(&self, ctx: &AuthContext<'_>) -> Result<AuthOutcome, AuthError> {
        let AuthScheme::OAuth2Refresh {
            token_url,
            client_id,
            client_secret,
            refresh_token,
            scope,
        } = &ctx.entry.scheme
        else {
            return Err(AuthError::Validation(
                "credential is not an OAuth2 refresh credential".to_string(),
            ));
        };

        let mut resolver = PlaceholderResolver::new(ctx.env_vars);
        let grant = RefreshGrant {
            token_url: resolver.resolve(token_url),
            client_id: resolver.resolve(client_id),
            client_secret: resolver.resolve_opt(client_secret.as_deref()),
            refresh_token: resolver.resolve(refresh_token),
            scope: resolver.resolve_opt(scope.as_deref()),
        };
        resolver.finish()?;

        if grant.token_url.trim().is_empty() {
            return Err(AuthError::Validation("token URL is empty".to_string()));
        }
        if grant.refresh_token.trim().is_empty() {
            return Err(AuthError::Validation("refresh token is empty".to_string()));
        }

        if let Some(token) = self.cache.token(&ctx.entry.id).await
            && !token.is_expiring(EXPIRY_SKEW_SECONDS)
        {
            return Ok(bearer(&token));
        }

        // Single flight: concurrent callers wait here, then reuse the
        // token the first one cached.
        let lock = self.cache.entry_lock(&ctx.entry.id).await;
        let _guard = lock.lock().await;
        if let Some(token) = self.cache.token(&ctx.entry.id).await
            && !token.is_expiring(EXPIRY_SKEW_SECONDS)
        {
            return Ok(bearer(&token));
        }

        debug!(credential = %ctx.entry.id, "refreshing OAuth2 access token");
        let token = self.refresh(ctx, &grant).await?;
        self.cache.store_token(&ctx.entry.id, token.clone()).await;
        Ok(bearer(&token))
    }
}

struct RefreshGrant {
    token_url: String,
    client_id: String,
    client_secret: Option<String>,
    refresh_token: String,
    scope: Option<String>,
}

fn bearer(token: &CachedToken) -> AuthOutcome {
    AuthOutcome::header("Authorization", format!("Bearer {}", token.access_token))
}
