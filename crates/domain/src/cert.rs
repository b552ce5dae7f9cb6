//! Stored certificate entries and TLS agent configuration.
//!
//! A [`CertEntry`] scopes a CA or client certificate to a set of hosts.
//! The resolver turns a matching entry into a [`TlsAgentConfig`] the
//! transport adapter applies when building its TLS connector.

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::filter::admits_host;

/// A stored certificate entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertEntry {
    /// Kind of certificate.
    #[serde(rename = "type")]
    pub kind: CertKind,
    /// Path to the certificate file (PEM).
    pub cert_file: PathBuf,
    /// Path to the private key file, for client certificates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_file: Option<PathBuf>,
    /// Hosts this certificate applies to. Empty means "all domains".
    #[serde(default)]
    pub domain_filters: BTreeSet<String>,
    /// Optional expiry; expired entries are never selected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<DateTime<Utc>>,
    /// Disabled entries are never selected.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

const fn default_enabled() -> bool {
    true
}

impl CertEntry {
    /// Creates an enabled CA-trust entry.
    #[must_use]
    pub fn ca(cert_file: impl Into<PathBuf>) -> Self {
        Self {
            kind: CertKind::Ca,
            cert_file: cert_file.into(),
            key_file: None,
            domain_filters: BTreeSet::new(),
            expiry_date: None,
            enabled: true,
        }
    }

    /// Creates an enabled self-signed client-certificate entry.
    #[must_use]
    pub fn self_signed(cert_file: impl Into<PathBuf>, key_file: impl Into<PathBuf>) -> Self {
        Self {
            kind: CertKind::SelfSigned,
            cert_file: cert_file.into(),
            key_file: Some(key_file.into()),
            domain_filters: BTreeSet::new(),
            expiry_date: None,
            enabled: true,
        }
    }

    /// Restricts the certificate to the given hosts.
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

/// Kind of stored certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertKind {
    /// A CA certificate added to the trust store.
    Ca,
    /// A self-signed client certificate presented to the server.
    SelfSigned,
}

/// TLS configuration the transport applies for a single request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsAgentConfig {
    /// When false, server certificate validation is skipped.
    #[serde(default = "default_reject")]
    pub reject_unauthorized: bool,
    /// An additional CA certificate to trust.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_ca: Option<PathBuf>,
    /// A client identity to present during the handshake.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<ClientIdentity>,
}

const fn default_reject() -> bool {
    true
}

impl Default for TlsAgentConfig {
    fn default() -> Self {
        Self {
            reject_unauthorized: true,
            extra_ca: None,
            identity: None,
        }
    }
}

impl TlsAgentConfig {
    /// Builds the agent configuration for a matching certificate entry.
    #[must_use]
    pub fn for_cert(entry: &CertEntry) -> Self {
        match entry.kind {
            CertKind::Ca => Self {
                extra_ca: Some(entry.cert_file.clone()),
                ..Self::default()
            },
            CertKind::SelfSigned => Self {
                identity: Some(ClientIdentity {
                    cert_file: entry.cert_file.clone(),
                    key_file: entry.key_file.clone(),
                }),
                ..Self::default()
            },
        }
    }

    /// A config that only disables certificate validation.
    #[must_use]
    pub fn insecure() -> Self {
        Self {
            reject_unauthorized: false,
            ..Self::default()
        }
    }

    /// Merges the global `ignore_certificate_validation` override in.
    ///
    /// The override forces `reject_unauthorized = false` while keeping any
    /// custom CA or client identity options.
    #[must_use]
    pub const fn with_global_override(mut self, ignore_certificate_validation: bool) -> Self {
        if ignore_certificate_validation {
            self.reject_unauthorized = false;
        }
        self
    }
}

/// A client certificate and key presented for mTLS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientIdentity {
    /// Path to the certificate file (PEM).
    pub cert_file: PathBuf,
    /// Path to the private key file; `None` when the key is bundled in
    /// the certificate file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_file: Option<PathBuf>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_expired_cert_is_not_usable() {
        let cert = CertEntry::ca("/certs/ca.pem")
            .with_expiry(Utc::now() - chrono::Duration::days(1));
        assert!(!cert.is_usable(Utc::now()));
    }

    #[test]
    fn test_disabled_cert_is_not_usable() {
        let mut cert = CertEntry::ca("/certs/ca.pem");
        cert.enabled = false;
        assert!(!cert.is_usable(Utc::now()));
    }

    #[test]
    fn test_ca_entry_builds_trust_agent() {
        let cert = CertEntry::ca("/certs/ca.pem");
        let agent = TlsAgentConfig::for_cert(&cert);
        assert!(agent.reject_unauthorized);
        assert_eq!(agent.extra_ca, Some(PathBuf::from("/certs/ca.pem")));
        assert!(agent.identity.is_none());
    }

    #[test]
    fn test_self_signed_entry_builds_identity_agent() {
        let cert = CertEntry::self_signed("/certs/client.pem", "/certs/client.key");
        let agent = TlsAgentConfig::for_cert(&cert);
        let identity = agent.identity.unwrap();
        assert_eq!(identity.cert_file, PathBuf::from("/certs/client.pem"));
        assert_eq!(identity.key_file, Some(PathBuf::from("/certs/client.key")));
        assert!(agent.extra_ca.is_none());
    }

    #[test]
    fn test_global_override_merges_not_replaces() {
        let cert = CertEntry::ca("/certs/ca.pem");
        let agent = TlsAgentConfig::for_cert(&cert).with_global_override(true);
        assert!(!agent.reject_unauthorized);
        // Custom options survive the override.
        assert_eq!(agent.extra_ca, Some(PathBuf::from("/certs/ca.pem")));
    }

    #[test]
    fn test_global_override_disabled_keeps_validation() {
        let agent = TlsAgentConfig::default().with_global_override(false);
        assert!(agent.reject_unauthorized);
    }
}
