//! Request specification types.
//!
//! A [`RequestConfig`] is the logical request handed to the executor:
//! method, URL, headers, query parameters, body, an optional reference to
//! a stored credential, and the environment variables used to resolve
//! `{{variable}}` placeholders in credential fields.

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET request.
    #[default]
    Get,
    /// POST request.
    Post,
    /// PUT request.
    Put,
    /// PATCH request.
    Patch,
    /// DELETE request.
    Delete,
    /// HEAD request.
    Head,
    /// OPTIONS request.
    Options,
}

impl HttpMethod {
    /// The canonical upper-case method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            other => Err(DomainError::UnsupportedMethod(other.to_string())),
        }
    }
}

/// A request header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Header name.
    pub name: String,
    /// Header value.
    pub value: String,
}

impl Header {
    /// Creates a header.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A query parameter appended to the request URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParam {
    /// Parameter name.
    pub name: String,
    /// Parameter value.
    pub value: String,
}

impl QueryParam {
    /// Creates a query parameter.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// The logical request handed to the executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RequestConfig {
    /// HTTP method.
    #[serde(default)]
    pub method: HttpMethod,
    /// Request URL, without the extra `params`.
    pub url: String,
    /// Request headers.
    #[serde(default)]
    pub headers: Vec<Header>,
    /// Extra query parameters appended to the URL before sending.
    #[serde(default)]
    pub params: Vec<QueryParam>,
    /// Optional request body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Id of the stored [`crate::AuthEntry`] to apply, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,
    /// Environment variables for `{{variable}}` placeholder resolution.
    #[serde(default)]
    pub env_vars: HashMap<String, String>,
}

impl RequestConfig {
    /// Creates a GET request for the given URL.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Creates a request with the given method and URL.
    #[must_use]
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            ..Self::default()
        }
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(Header::new(name, value));
        self
    }

    /// Adds a query parameter.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push(QueryParam::new(name, value));
        self
    }

    /// References a stored credential by id.
    #[must_use]
    pub fn with_auth(mut self, auth_id: impl Into<String>) -> Self {
        self.auth = Some(auth_id.into());
        self
    }

    /// Adds an environment variable for placeholder resolution.
    #[must_use]
    pub fn with_env_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(name.into(), value.into());
        self
    }

    /// Returns true when a header with the given name exists
    /// (case-insensitive).
    #[must_use]
    pub fn has_header(&self, name: &str) -> bool {
        self.headers
            .iter()
            .any(|h| h.name.eq_ignore_ascii_case(name))
    }

    /// Returns the value of the first header with the given name
    /// (case-insensitive).
    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }
}

/// Appends query parameters to a URL string.
///
/// Uses `&` when the URL already carries a query string, `?` otherwise.
/// Parameters are appended verbatim, in order.
#[must_use]
pub fn append_query(url: &str, params: &[QueryParam]) -> String {
    let mut result = url.to_string();
    for param in params {
        let separator = if result.contains('?') { '&' } else { '?' };
        result.push(separator);
        result.push_str(&param.name);
        result.push('=');
        result.push_str(&param.value);
    }
    result
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_method_round_trip() {
        for method in [
            HttpMethod::Get,
            HttpMethod::Post,
            HttpMethod::Put,
            HttpMethod::Patch,
            HttpMethod::Delete,
            HttpMethod::Head,
            HttpMethod::Options,
        ] {
            assert_eq!(method.as_str().parse::<HttpMethod>().unwrap(), method);
        }
    }

    #[test]
    fn test_method_parse_is_case_insensitive() {
        assert_eq!("get".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
    }

    #[test]
    fn test_method_parse_rejects_unknown() {
        assert!(matches!(
            "BREW".parse::<HttpMethod>(),
            Err(DomainError::UnsupportedMethod(_))
        ));
    }

    #[test]
    fn test_has_header_case_insensitive() {
        let config = RequestConfig::get("https://example.com").with_header("X-Api-Key", "abc");
        assert!(config.has_header("x-api-key"));
        assert!(config.has_header("X-API-KEY"));
        assert!(!config.has_header("authorization"));
    }

    #[test]
    fn test_header_value_lookup() {
        let config = RequestConfig::get("https://example.com").with_header("Cookie", "a=1");
        assert_eq!(config.header_value("cookie"), Some("a=1"));
        assert_eq!(config.header_value("accept"), None);
    }

    #[test]
    fn test_append_query_uses_question_mark_first() {
        let params = vec![QueryParam::new("a", "1"), QueryParam::new("b", "2")];
        assert_eq!(
            append_query("https://example.com/api", &params),
            "https://example.com/api?a=1&b=2"
        );
    }

    #[test]
    fn test_append_query_uses_ampersand_when_query_present() {
        let params = vec![QueryParam::new("b", "2")];
        assert_eq!(
            append_query("https://example.com/api?a=1", &params),
            "https://example.com/api?a=1&b=2"
        );
    }

    #[test]
    fn test_append_query_empty_params_is_identity() {
        assert_eq!(
            append_query("https://example.com/api", &[]),
            "https://example.com/api"
        );
    }
}
