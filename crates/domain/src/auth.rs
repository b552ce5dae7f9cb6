//! Stored authentication entries.
//!
//! An [`AuthEntry`] is a named, domain-scoped credential persisted by the
//! surrounding application and consumed by the auth engine. The concrete
//! protocol lives in the [`AuthScheme`] tagged union.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::filter::admits_host;

/// A stored credential scoped to a set of domains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthEntry {
    /// Unique identifier, also the key for cached auth state.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Disabled entries are never applied.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Hosts this entry applies to. Empty means "all domains".
    #[serde(default)]
    pub domain_filters: BTreeSet<String>,
    /// Optional expiry; expired entries are never applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<DateTime<Utc>>,
    /// The authentication protocol and its credential fields.
    #[serde(flatten)]
    pub scheme: AuthScheme,
}

const fn default_enabled() -> bool {
    true
}

impl AuthEntry {
    /// Creates an enabled entry with a fresh id.
    #[must_use]
    pub fn new(name: impl Into<String>, scheme: AuthScheme) -> Self {
        Self {
            id: crate::id::generate_id(),
            name: name.into(),
            enabled: true,
            domain_filters: BTreeSet::new(),
            expiry_date: None,
            scheme,
        }
    }

    /// Restricts the entry to the given hosts.
    #[must_use]
    pub fn with_domain_filters<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.domain_filters = hosts.into_iter().map(Into::into).collect();
        self
    }

    /// Sets an expiry date.
    #[must_use]
    pub const fn with_expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry_date = Some(expiry);
        self
    }

    /// Returns true when the entry applies to the given host.
    ///
    /// An empty filter set applies to all domains.
    #[must_use]
    pub fn applies_to_host(&self, host: &str) -> bool {
        admits_host(&self.domain_filters, host)
    }

    /// Returns true when the entry is enabled and not expired at `now`.
    #[must_use]
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.enabled && !self.expiry_date.is_some_and(|exp| exp <= now)
    }
}

/// The authentication protocol of a stored entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthScheme {
    /// Static API key sent as a header or query parameter.
    ApiKey {
        /// Header or query parameter name.
        key: String,
        /// The key value (may contain `{{variable}}` references).
        value: String,
        /// Where to attach the key.
        #[serde(default)]
        send_in: ApiKeySendIn,
        /// Optional prefix prepended to the value (e.g. "Token").
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prefix: Option<String>,
    },
    /// HTTP Basic authentication.
    Basic {
        /// Username (may contain variables).
        username: String,
        /// Password (may contain variables).
        password: String,
    },
    /// HTTP Digest authentication (RFC 2617 challenge-response).
    Digest {
        /// Username (may contain variables).
        username: String,
        /// Password (may contain variables).
        password: String,
    },
    /// `OAuth2` refresh-token renewal.
    #[serde(rename = "oauth2_refresh")]
    OAuth2Refresh {
        /// Token endpoint URL.
        token_url: String,
        /// Client ID.
        client_id: String,
        /// Client secret, if the provider requires one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_secret: Option<String>,
        /// The long-lived refresh token.
        refresh_token: String,
        /// Space-separated scopes.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        scope: Option<String>,
    },
}

impl AuthScheme {
    /// Short protocol label for logging.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::ApiKey { .. } => "api_key",
            Self::Basic { .. } => "basic",
            Self::Digest { .. } => "digest",
            Self::OAuth2Refresh { .. } => "oauth2_refresh",
        }
    }
}

/// Location for API key authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApiKeySendIn {
    /// Add to request headers.
    #[default]
    Header,
    /// Add to query parameters.
    Query,
}

/// Authentication errors surfaced by strategies and the auth engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// A credential field is missing or invalid.
    #[error("invalid credential: {0}")]
    Validation(String),

    /// One or more `{{variable}}` references had no matching entry.
    #[error("unresolved placeholders: {}", names.join(", "))]
    UnresolvedPlaceholder {
        /// Every unresolved token name, in order of first appearance.
        names: Vec<String>,
    },

    /// A `WWW-Authenticate` challenge could not be parsed.
    #[error("malformed authentication challenge: {0}")]
    ChallengeParse(String),

    /// The `OAuth2` token endpoint rejected the refresh or was unreachable.
    #[error("token refresh failed: {0}")]
    TokenRefresh(String),

    /// A network failure occurred during an auth-owned round trip.
    #[error("network error during authentication: {0}")]
    Network(String),
}
