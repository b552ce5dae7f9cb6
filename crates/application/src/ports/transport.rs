//! The HTTP transport port.
//!
//! The executor and the authentication strategies never touch a real
//! HTTP client; they hand a fully prepared [`TransportRequest`] to an
//! [`HttpTransport`] and get back either a [`TransportResponse`] (any
//! status code) or a [`TransportError`] for failures below the HTTP
//! layer.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;
use url::Url;
use waypoint_domain::{HttpMethod, ResolvedProxy, TlsAgentConfig};

/// A fully prepared outgoing request.
///
/// The URL already carries the request's query parameters; proxy and
/// TLS options have been resolved for its host.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Absolute URL, query string included.
    pub url: String,
    /// Headers in send order.
    pub headers: Vec<(String, String)>,
    /// Optional request body.
    pub body: Option<String>,
    /// Proxy to route the request through, if any.
    pub proxy: Option<ResolvedProxy>,
    /// TLS options for HTTPS targets, if any.
    pub tls: Option<TlsAgentConfig>,
    /// Overall timeout in milliseconds; `0` disables the timeout.
    pub timeout_ms: u64,
    /// Maximum number of redirects to follow; `0` disables redirects.
    pub max_redirects: usize,
}

impl TransportRequest {
    /// Creates a bare request with no headers, body, proxy or TLS
    /// options and no timeout.
    #[must_use]
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            proxy: None,
            tls: None,
            timeout_ms: 0,
            max_redirects: 0,
        }
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Returns true when a header with the given name exists
    /// (case-insensitive).
    #[must_use]
    pub fn has_header(&self, name: &str) -> bool {
        self.headers.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    /// The value of the first header with the given name
    /// (case-insensitive).
    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The request-target (path plus query) used in Digest `uri=`
    /// fields. Falls back to `/` when the URL does not parse.
    #[must_use]
    pub fn request_uri(&self) -> String {
        Url::parse(&self.url).map_or_else(
            |_| "/".to_string(),
            |url| {
                let mut uri = url.path().to_string();
                if let Some(query) = url.query() {
                    uri.push('?');
                    uri.push_str(query);
                }
                uri
            },
        )
    }

    /// The host component of the URL, if it parses.
    #[must_use]
    pub fn host(&self) -> Option<String> {
        Url::parse(&self.url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
    }
}

/// A raw HTTP response as seen by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Reason phrase reported by the server, possibly empty.
    pub status_text: String,
    /// Headers in arrival order, names lower-cased. Repeated headers
    /// (notably `set-cookie`) appear once per value.
    pub headers: Vec<(String, String)>,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// The first header value with the given name (case-insensitive).
    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All header values with the given name (case-insensitive).
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> {
        self.headers
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns true for a 2xx status.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Failures below the HTTP layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The URL could not be parsed.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    /// The overall timeout elapsed.
    #[error("request timed out after {timeout_ms} ms")]
    Timeout {
        /// The timeout that elapsed.
        timeout_ms: u64,
    },
    /// The host name did not resolve.
    #[error("DNS resolution failed for {host}")]
    Dns {
        /// Host that failed to resolve.
        host: String,
    },
    /// The target refused the connection.
    #[error("connection refused by {host}")]
    ConnectionRefused {
        /// Host that refused the connection.
        host: String,
    },
    /// Any other connection-level failure.
    #[error("connection failed: {0}")]
    Connection(String),
    /// The redirect limit was exceeded.
    #[error("too many redirects (limit {max})")]
    TooManyRedirects {
        /// The configured redirect limit.
        max: usize,
    },
    /// The request was cancelled by the caller.
    #[error("request cancelled")]
    Cancelled,
    /// Anything else the transport could not classify.
    #[error("transport error: {0}")]
    Other(String),
}

/// Performs prepared requests. Implemented by the real HTTP client
/// adapter and by test doubles.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends the request and collects the full response body.
    ///
    /// HTTP error statuses are returned as `Ok`; only failures below
    /// the HTTP layer produce a [`TransportError`].
    async fn perform(
        &self,
        request: TransportRequest,
        cancel: CancellationToken,
    ) -> Result<TransportResponse, TransportError>;
}

/// A clonable token used to cancel an in-flight request.
///
/// Every clone observes the same cancellation; transports race the
/// exchange against [`CancellationToken::cancelled`].
#[derive(Debug, Clone)]
pub struct CancellationToken {
    sender: watch::Sender<bool>,
    receiver: watch::Receiver<bool>,
}

impl CancellationToken {
    /// Creates a token in the not-cancelled state.
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self { sender, receiver }
    }

    /// Signals cancellation to every clone of this token.
    pub fn cancel(&self) {
        let _ = self.sender.send(true);
    }

    /// Returns true once [`Self::cancel`] has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once the token is cancelled.
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        if *receiver.borrow() {
            return;
        }
        // The sender half lives in this token, so changed() only errs
        // if every other clone is gone, in which case cancel() can no
        // longer be called.
        while receiver.changed().await.is_ok() {
            if *receiver.borrow() {
                return;
            }
        }
        std::future::pending::<()>().await;
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_request_uri_includes_query() {
        let request =
            TransportRequest::new(HttpMethod::Get, "https://api.example.com/v1/items?page=2");
        assert_eq!(request.request_uri(), "/v1/items?page=2");
    }

    #[test]
    fn test_request_uri_falls_back_to_root() {
        let request = TransportRequest::new(HttpMethod::Get, "not a url");
        assert_eq!(request.request_uri(), "/");
    }

    #[test]
    fn test_header_lookup_case_insensitive() {
        let request = TransportRequest::new(HttpMethod::Get, "https://example.com")
            .with_header("Authorization", "Bearer abc");
        assert!(request.has_header("authorization"));
        assert_eq!(request.header_value("AUTHORIZATION"), Some("Bearer abc"));
    }

    #[test]
    fn test_response_header_values_collects_duplicates() {
        let response = TransportResponse {
            status: 200,
            status_text: "OK".to_string(),
            headers: vec![
                ("set-cookie".to_string(), "a=1".to_string()),
                ("content-type".to_string(), "text/plain".to_string()),
                ("set-cookie".to_string(), "b=2".to_string()),
            ],
            body: Vec::new(),
        };
        let cookies: Vec<_> = response.header_values("Set-Cookie").collect();
        assert_eq!(cookies, vec!["a=1", "b=2"]);
    }

    #[tokio::test]
    async fn test_cancellation_is_observed_by_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
        clone.cancelled().await;
    }

    #[tokio::test]
    async fn test_cancelled_resolves_after_later_cancel() {
        let token = CancellationToken::new();
        let waiter = token.clone();
        let handle = tokio::spawn(async move {
            waiter.cancelled().await;
        });
        token.cancel();
        handle.await.unwrap();
    }
}
