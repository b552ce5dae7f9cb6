//! The request executor.
//!
//! Orchestrates one HTTP exchange end to end: validate the URL, append
//! query parameters, inject stored cookies, resolve proxy and TLS
//! policy, apply the referenced credential, perform the exchange, and
//! fold response cookies back into the jar.
//!
//! Failures below the HTTP layer are not errors to the caller; they
//! come back as a result with `status = 0` and a message. Cancellation
//! and configuration problems are the only hard errors.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, warn};
use waypoint_domain::{AuthEntry, ExecutionResult, RequestConfig, append_query, reason_phrase};

use crate::auth::{AuthCache, AuthEngine, AuthOutcome};
use crate::cookie_jar::CookieJar;
use crate::error::ExecutorError;
use crate::policy::NetworkPolicyResolver;
use crate::ports::{
    CancellationToken, ConfigStore, CookieStore, HttpTransport, SettingsProvider, TransportError,
    TransportRequest, TransportResponse,
};

/// Executes [`RequestConfig`]s against an [`HttpTransport`].
pub struct RequestExecutor {
    transport: Arc<dyn HttpTransport>,
    settings: Arc<dyn SettingsProvider>,
    config_store: Arc<dyn ConfigStore>,
    cookie_jar: CookieJar,
    policy: NetworkPolicyResolver,
    auth: AuthEngine,
}

impl RequestExecutor {
    /// Wires an executor over its collaborators.
    #[must_use]
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        settings: Arc<dyn SettingsProvider>,
        config_store: Arc<dyn ConfigStore>,
        cookie_store: Arc<dyn CookieStore>,
    ) -> Self {
        Self {
            cookie_jar: CookieJar::new(cookie_store),
            policy: NetworkPolicyResolver::new(config_store.clone()),
            auth: AuthEngine::new(transport.clone()),
            transport,
            settings,
            config_store,
        }
    }

    /// The per-credential auth state cache (Digest nonces, `OAuth2`
    /// tokens).
    #[must_use]
    pub fn auth_cache(&self) -> &AuthCache {
        self.auth.cache()
    }

    /// Performs one request.
    ///
    /// # Errors
    ///
    /// [`ExecutorError::Validation`] for a bad URL or an unknown
    /// credential id, [`ExecutorError::Auth`] when applying the
    /// credential fails, [`ExecutorError::Cancelled`] when `cancel`
    /// fires. Network failures are `Ok` results with `status = 0`.
    pub async fn send(
        &self,
        config: &RequestConfig,
        cancel: &CancellationToken,
    ) -> Result<ExecutionResult, ExecutorError> {
        validate(config)?;
        let settings = self.settings.settings();
        let started = Instant::now();

        let full_url = append_query(&config.url, &config.params);

        let mut headers: Vec<(String, String)> = config
            .headers
            .iter()
            .map(|h| (h.name.clone(), h.value.clone()))
            .collect();
        // A caller-set Cookie header always wins over the jar.
        if !config.has_header("cookie") {
            let cookie = self.cookie_jar.header_for_url(&full_url).await;
            if !cookie.is_empty() {
                headers.push(("Cookie".to_string(), cookie));
            }
        }

        let proxy = self.policy.proxy_for_url(&full_url).await;
        let tls = self
            .policy
            .https_agent_for_url(&full_url, settings.ignore_certificate_validation)
            .await;

        let mut request = TransportRequest {
            method: config.method,
            url: full_url,
            headers,
            body: config.body.clone(),
            proxy,
            tls,
            timeout_ms: settings.timeout_ms,
            max_redirects: settings.max_redirects,
        };

        if let Some(auth_id) = &config.auth
            && let Some(response) = self
                .apply_auth(auth_id, &mut request, &config.env_vars, cancel)
                .await?
        {
            // Digest performed the exchange itself.
            let url = request.url.clone();
            return Ok(self.finish(response, &url, started).await);
        }

        let url = request.url.clone();
        match self.transport.perform(request, cancel.clone()).await {
            Ok(response) => Ok(self.finish(response, &url, started).await),
            Err(TransportError::Cancelled) => Err(ExecutorError::Cancelled),
            Err(error) => {
                info!(%error, %url, "request failed below the HTTP layer");
                Ok(ExecutionResult::from_failure(
                    error.to_string(),
                    elapsed_ms(started),
                ))
            }
        }
    }

    /// Looks the credential up and applies it, merging additive
    /// outcomes into `request`. Returns a response when the strategy
    /// performed the exchange itself.
    async fn apply_auth(
        &self,
        auth_id: &str,
        request: &mut TransportRequest,
        env_vars: &HashMap<String, String>,
        cancel: &CancellationToken,
    ) -> Result<Option<TransportResponse>, ExecutorError> {
        let Some(entry) = self.lookup_auth(auth_id, request).await? else {
            return Ok(None);
        };
        debug!(credential = %entry.id, scheme = entry.scheme.label(), "applying credential");
        match self.auth.apply_auth(&entry, request, env_vars, cancel).await {
            Ok(AuthOutcome::Augment {
                headers,
                query_params,
            }) => {
                request.headers.extend(headers);
                if !query_params.is_empty() {
                    request.url = append_query(&request.url, &query_params);
                }
                Ok(None)
            }
            Ok(AuthOutcome::Handled { response }) => Ok(Some(response)),
            Err(_) if cancel.is_cancelled() => Err(ExecutorError::Cancelled),
            Err(error) => Err(ExecutorError::Auth(error)),
        }
    }

    /// Finds a usable credential for this request.
    ///
    /// An unknown id is a hard error; a credential that is disabled,
    /// expired, or scoped to other hosts is skipped silently.
    async fn lookup_auth(
        &self,
        auth_id: &str,
        request: &TransportRequest,
    ) -> Result<Option<AuthEntry>, ExecutorError> {
        let auths = match self.config_store.load_auths().await {
            Ok(auths) => auths,
            Err(error) => {
                warn!(%error, "could not load credentials, sending unauthenticated");
                return Ok(None);
            }
        };
        let Some(entry) = auths.into_iter().find(|a| a.id == auth_id) else {
            return Err(ExecutorError::Validation(format!(
                "unknown credential: {auth_id}"
            )));
        };
        if !entry.is_usable(Utc::now()) {
            debug!(credential = %auth_id, "credential disabled or expired, sending unauthenticated");
            return Ok(None);
        }
        let host = request.host().unwrap_or_default();
        if !entry.applies_to_host(&host) {
            debug!(credential = %auth_id, %host, "credential scoped to other hosts, sending unauthenticated");
            return Ok(None);
        }
        Ok(Some(entry))
    }

    async fn finish(
        &self,
        response: TransportResponse,
        url: &str,
        started: Instant,
    ) -> ExecutionResult {
        let new_cookies = self.cookie_jar.apply_set_cookies(&response.headers, url).await;
        let status_text = if response.status_text.is_empty() {
            reason_phrase(response.status).to_string()
        } else {
            response.status_text
        };
        let mut result = ExecutionResult::from_response(
            response.status,
            status_text,
            response.headers,
            response.body,
            elapsed_ms(started),
        );
        result.new_cookies = new_cookies;
        result
    }
}

fn validate(config: &RequestConfig) -> Result<(), ExecutorError> {
    let url = config.url.trim();
    if url.is_empty() {
        return Err(ExecutorError::Validation("URL is required".to_string()));
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ExecutorError::Validation(format!(
            "URL must start with http:// or https://: {url}"
        )));
    }
    Ok(())
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
