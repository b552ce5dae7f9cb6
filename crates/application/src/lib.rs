//! Waypoint Application - Ports and core services
//!
//! This crate contains the request-execution core: the executor, the
//! pluggable authentication engine, the cookie jar service and the
//! network policy resolver, together with the port traits implemented
//! by infrastructure adapters.

pub mod auth;
pub mod cookie_jar;
pub mod error;
pub mod executor;
pub mod placeholder;
pub mod policy;
pub mod ports;

#[cfg(test)]
pub(crate) mod test_support;

pub use auth::{
    AuthCache, AuthContext, AuthEngine, AuthOutcome, AuthStrategy, CachedToken, DigestState,
};
pub use cookie_jar::CookieJar;
pub use error::ExecutorError;
pub use executor::RequestExecutor;
pub use placeholder::PlaceholderResolver;
pub use policy::{NetworkPolicyResolver, select_https_agent, select_proxy};
pub use ports::{
    CancellationToken, ConfigStore, CookieStore, HttpTransport, SettingsProvider, StoreError,
    TransportError, TransportRequest, TransportResponse,
};
