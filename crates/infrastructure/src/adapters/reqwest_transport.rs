//! HTTP transport implementation using reqwest.
//!
//! Proxy routing, TLS options, redirect limits and timeouts vary per
//! request, so a dedicated `reqwest::Client` is built for each call
//! instead of reusing one shared client. The exchange is raced against
//! the cancellation token.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::{Certificate, Client, Identity, Method};
use tracing::debug;
use waypoint_application::{
    CancellationToken, HttpTransport, TransportError, TransportRequest, TransportResponse,
};
use waypoint_domain::{HttpMethod, TlsAgentConfig};

/// HTTP transport backed by reqwest.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReqwestTransport;

impl ReqwestTransport {
    /// Creates the transport.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    const fn to_reqwest_method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
            HttpMethod::Head => Method::HEAD,
            HttpMethod::Options => Method::OPTIONS,
        }
    }

    /// Builds a client configured for this request's proxy, TLS and
    /// redirect options.
    async fn build_client(request: &TransportRequest) -> Result<Client, TransportError> {
        let redirect = if request.max_redirects == 0 {
            Policy::none()
        } else {
            Policy::limited(request.max_redirects)
        };
        let mut builder = Client::builder()
            .user_agent("Waypoint/0.1.0")
            .redirect(redirect);

        if let Some(proxy) = &request.proxy {
            debug!(proxy = %proxy.url, "routing through proxy");
            let mut reqwest_proxy = reqwest::Proxy::all(&proxy.url)
                .map_err(|e| TransportError::Other(format!("invalid proxy {}: {e}", proxy.url)))?;
            if let Some(auth) = &proxy.auth {
                reqwest_proxy = reqwest_proxy.basic_auth(&auth.username, &auth.password);
            }
            builder = builder.proxy(reqwest_proxy);
        }

        if let Some(tls) = &request.tls {
            builder = Self::apply_tls(builder, tls).await?;
        }

        builder
            .build()
            .map_err(|e| TransportError::Other(format!("could not build HTTP client: {e}")))
    }

    async fn apply_tls(
        mut builder: reqwest::ClientBuilder,
        tls: &TlsAgentConfig,
    ) -> Result<reqwest::ClientBuilder, TransportError> {
        if !tls.reject_unauthorized {
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(ca_path) = &tls.extra_ca {
            let pem = tokio::fs::read(ca_path).await.map_err(|e| {
                TransportError::Other(format!("could not read CA file {}: {e}", ca_path.display()))
            })?;
            let certificate = Certificate::from_pem(&pem).map_err(|e| {
                TransportError::Other(format!("invalid CA file {}: {e}", ca_path.display()))
            })?;
            builder = builder.add_root_certificate(certificate);
        }

        if let Some(identity) = &tls.identity {
            let mut pem = tokio::fs::read(&identity.cert_file).await.map_err(|e| {
                TransportError::Other(format!(
                    "could not read client certificate {}: {e}",
                    identity.cert_file.display()
                ))
            })?;
            if let Some(key_path) = &identity.key_file {
                let key = tokio::fs::read(key_path).await.map_err(|e| {
                    TransportError::Other(format!(
                        "could not read client key {}: {e}",
                        key_path.display()
                    ))
                })?;
                pem.extend_from_slice(b"\n");
                pem.extend_from_slice(&key);
            }
            let identity = Identity::from_pem(&pem)
                .map_err(|e| TransportError::Other(format!("invalid client identity: {e}")))?;
            builder = builder.identity(identity);
        }

        Ok(builder)
    }

    fn map_error(error: &reqwest::Error, request: &TransportRequest) -> TransportError {
        debug!(%error, url = %request.url, "classifying transport failure");
        let host = error
            .url()
            .and_then(|u| u.host_str())
            .map_or_else(|| request.host().unwrap_or_default(), str::to_string);

        if error.is_timeout() {
            return TransportError::Timeout {
                timeout_ms: request.timeout_ms,
            };
        }
        if error.is_connect() {
            let message = error.to_string().to_lowercase();
            if message.contains("dns") || message.contains("resolve") {
                return TransportError::Dns { host };
            }
            if message.contains("refused") {
                return TransportError::ConnectionRefused { host };
            }
            return TransportError::Connection(error.to_string());
        }
        if error.is_redirect() {
            return TransportError::TooManyRedirects {
                max: request.max_redirects,
            };
        }
        TransportError::Other(error.to_string())
    }

    async fn exchange(request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let url = reqwest::Url::parse(&request.url)
            .map_err(|e| TransportError::InvalidUrl(format!("{e}: {}", request.url)))?;

        debug!(method = request.method.as_str(), url = %request.url, "performing exchange");
        let client = Self::build_client(&request).await?;
        let mut builder = client.request(Self::to_reqwest_method(request.method), url);
        if request.timeout_ms > 0 {
            builder = builder.timeout(Duration::from_millis(request.timeout_ms));
        }
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Self::map_error(&e, &request))?;

        let status = response.status();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or("<binary>").to_string(),
                )
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Other(format!("could not read response body: {e}")))?
            .to_vec();

        Ok(TransportResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            headers,
            body,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn perform(
        &self,
        request: TransportRequest,
        cancel: CancellationToken,
    ) -> Result<TransportResponse, TransportError> {
        tokio::select! {
            result = Self::exchange(request) => result,
            () = cancel.cancelled() => Err(TransportError::Cancelled),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use waypoint_domain::{ProxyEntry, ResolvedProxy};

    use super::*;

    fn request() -> TransportRequest {
        TransportRequest::new(HttpMethod::Get, "https://api.example.com/")
    }

    #[test]
    fn test_method_conversion() {
        assert_eq!(
            ReqwestTransport::to_reqwest_method(HttpMethod::Get),
            Method::GET
        );
        assert_eq!(
            ReqwestTransport::to_reqwest_method(HttpMethod::Delete),
            Method::DELETE
        );
    }

    #[tokio::test]
    async fn test_build_client_plain() {
        assert!(ReqwestTransport::build_client(&request()).await.is_ok());
    }

    #[tokio::test]
    async fn test_build_client_with_proxy() {
        let mut req = request();
        req.proxy = Some(
            ProxyEntry::new("proxy.local")
                .with_port(3128)
                .with_auth("user", "pass")
                .resolve(),
        );
        assert!(ReqwestTransport::build_client(&req).await.is_ok());
    }

    #[tokio::test]
    async fn test_build_client_rejects_bad_proxy_url() {
        let mut req = request();
        req.proxy = Some(ResolvedProxy {
            url: "::not a url::".to_string(),
            auth: None,
        });
        assert!(matches!(
            ReqwestTransport::build_client(&req).await,
            Err(TransportError::Other(_))
        ));
    }

    #[tokio::test]
    async fn test_build_client_insecure_tls() {
        let mut req = request();
        req.tls = Some(TlsAgentConfig::insecure());
        assert!(ReqwestTransport::build_client(&req).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_ca_file_is_reported() {
        let mut req = request();
        req.tls = Some(TlsAgentConfig {
            reject_unauthorized: true,
            extra_ca: Some("/nonexistent/ca.pem".into()),
            identity: None,
        });
        assert!(matches!(
            ReqwestTransport::build_client(&req).await,
            Err(TransportError::Other(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_url_is_reported() {
        let req = TransportRequest::new(HttpMethod::Get, "not a url");
        let error = ReqwestTransport
            .perform(req, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(error, TransportError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_pre_cancelled_token_short_circuits() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let error = ReqwestTransport
            .perform(request(), cancel)
            .await
            .unwrap_err();
        assert_eq!(error, TransportError::Cancelled);
    }
}
