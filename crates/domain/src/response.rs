//! Execution result types.
//!
//! The executor returns an [`ExecutionResult`] for every transport
//! outcome: a real HTTP response (any status), or a network-level failure
//! encoded as `status = 0` with an error message. Callers never need to
//! catch anything.

use serde::{Deserialize, Serialize};

use crate::cookie::Cookie;

/// The structured outcome of a performed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// HTTP status code; `0` for network-level failures.
    pub status: u16,
    /// Status text (e.g. "OK", "Not Found"); empty for failures.
    pub status_text: String,
    /// Response headers in arrival order. Names are lower-cased by the
    /// transport; duplicates (notably `set-cookie`) are preserved.
    pub headers: Vec<(String, String)>,
    /// Raw response body.
    #[serde(with = "serde_bytes_vec")]
    pub body: Vec<u8>,
    /// Wall-clock time spent on the whole exchange, in milliseconds.
    pub elapsed_time_ms: u64,
    /// Byte length of the response body.
    pub size_bytes: u64,
    /// Cookies stored or updated from this response's `Set-Cookie` headers.
    #[serde(default)]
    pub new_cookies: Vec<Cookie>,
    /// Failure message when `status == 0`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResult {
    /// Builds a result from a real HTTP response.
    #[must_use]
    pub fn from_response(
        status: u16,
        status_text: impl Into<String>,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
        elapsed_time_ms: u64,
    ) -> Self {
        let size_bytes = body.len() as u64;
        Self {
            status,
            status_text: status_text.into(),
            headers,
            body,
            elapsed_time_ms,
            size_bytes,
            new_cookies: Vec::new(),
            error: None,
        }
    }

    /// Builds a network-failure result (`status = 0`).
    #[must_use]
    pub fn from_failure(message: impl Into<String>, elapsed_time_ms: u64) -> Self {
        Self {
            status: 0,
            status_text: String::new(),
            headers: Vec::new(),
            body: Vec::new(),
            elapsed_time_ms,
            size_bytes: 0,
            new_cookies: Vec::new(),
            error: Some(message.into()),
        }
    }

    /// Returns true when the exchange failed below the HTTP layer.
    #[must_use]
    pub const fn is_network_failure(&self) -> bool {
        self.status == 0
    }

    /// Returns true for a 2xx status.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// The body decoded as UTF-8, with replacement characters for
    /// invalid sequences.
    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// The first header value with the given name (case-insensitive).
    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// The canonical reason phrase for common status codes.
#[must_use]
pub const fn reason_phrase(status: u16) -> &'static str {
    match status {
        100 => "Continue",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        409 => "Conflict",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "",
    }
}

mod serde_bytes_vec {
    //! Serializes the body as a plain byte array.
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(bytes)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        Vec::<u8>::deserialize(deserializer)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_response_computes_size() {
        let result = ExecutionResult::from_response(200, "OK", vec![], b"hello".to_vec(), 42);
        assert_eq!(result.size_bytes, 5);
        assert_eq!(result.elapsed_time_ms, 42);
        assert!(result.is_success());
        assert!(!result.is_network_failure());
        assert_eq!(result.body_text(), "hello");
    }

    #[test]
    fn test_from_failure_is_status_zero() {
        let result = ExecutionResult::from_failure("connection refused", 10);
        assert!(result.is_network_failure());
        assert_eq!(result.status, 0);
        assert_eq!(result.error.as_deref(), Some("connection refused"));
        assert_eq!(result.size_bytes, 0);
    }

    #[test]
    fn test_header_lookup_case_insensitive() {
        let result = ExecutionResult::from_response(
            200,
            "OK",
            vec![("content-type".to_string(), "text/plain".to_string())],
            vec![],
            1,
        );
        assert_eq!(result.header_value("Content-Type"), Some("text/plain"));
    }

    #[test]
    fn test_reason_phrases() {
        assert_eq!(reason_phrase(200), "OK");
        assert_eq!(reason_phrase(401), "Unauthorized");
        assert_eq!(reason_phrase(599), "");
    }
}
