//! Domain-scoped proxy and TLS policy resolution.
//!
//! For each request URL the resolver picks the first enabled proxy
//! whose filters admit the host, and for HTTPS targets the first usable
//! certificate entry, merged with the global "ignore certificate
//! validation" override. Selection itself is pure; the resolver only
//! adds the configuration load.

use std::sync::Arc;

use chrono::Utc;
use tracing::warn;
use url::Url;
use waypoint_domain::{CertEntry, ProxyEntry, ResolvedProxy, TlsAgentConfig};

use crate::ports::ConfigStore;

/// Resolves per-request proxy and TLS options from stored
/// configuration.
pub struct NetworkPolicyResolver {
    store: Arc<dyn ConfigStore>,
}

impl NetworkPolicyResolver {
    /// Creates a resolver over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self { store }
    }

    /// The proxy to route the request through, if any entry applies.
    pub async fn proxy_for_url(&self, url: &str) -> Option<ResolvedProxy> {
        match self.store.load_proxies().await {
            Ok(proxies) => select_proxy(&proxies, url),
            Err(error) => {
                warn!(%error, "could not load proxies, connecting directly");
                None
            }
        }
    }

    /// The TLS options for an HTTPS request, if any certificate entry
    /// applies or the global override is set.
    pub async fn https_agent_for_url(
        &self,
        url: &str,
        ignore_certificate_validation: bool,
    ) -> Option<TlsAgentConfig> {
        match self.store.load_certs().await {
            Ok(certs) => select_https_agent(&certs, url, ignore_certificate_validation),
            Err(error) => {
                warn!(%error, "could not load certificates, using default TLS");
                select_https_agent(&[], url, ignore_certificate_validation)
            }
        }
    }
}

/// Picks the first enabled proxy admitting the URL's host.
///
/// An entry whose `exclude_domains` name the host never applies, even
/// when its include filters do.
#[must_use]
pub fn select_proxy(proxies: &[ProxyEntry], url: &str) -> Option<ResolvedProxy> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    proxies
        .iter()
        .find(|p| p.enabled && p.applies_to_host(host))
        .map(ProxyEntry::resolve)
}

/// Builds the TLS options for an HTTPS URL.
///
/// Expired or disabled certificate entries are never selected. With no
/// matching entry the global override alone still yields an insecure
/// agent; plain HTTP URLs never get one.
#[must_use]
pub fn select_https_agent(
    certs: &[CertEntry],
    url: &str,
    ignore_certificate_validation: bool,
) -> Option<TlsAgentConfig> {
    let parsed = Url::parse(url).ok()?;
    if parsed.scheme() != "https" {
        return None;
    }
    let host = parsed.host_str()?;
    let now = Utc::now();
    let agent = certs
        .iter()
        .find(|c| c.is_usable(now) && c.applies_to_host(host))
        .map(TlsAgentConfig::for_cert);

    match agent {
        Some(agent) => Some(agent.with_global_override(ignore_certificate_validation)),
        None if ignore_certificate_validation => Some(TlsAgentConfig::insecure()),
        None => None,
    }
}
