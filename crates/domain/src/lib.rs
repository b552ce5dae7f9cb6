//! Waypoint Domain - Core business types
//!
//! This crate defines the domain model for the Waypoint request-execution
//! engine: stored credentials, cookies, proxy and certificate entries,
//! request/response specifications and effective settings. All types here
//! are pure Rust with no I/O dependencies.

pub mod auth;
pub mod cert;
pub mod cookie;
pub mod error;
pub mod filter;
pub mod id;
pub mod proxy;
pub mod request;
pub mod response;
pub mod settings;

pub use auth::{ApiKeySendIn, AuthEntry, AuthError, AuthScheme};
pub use cert::{CertEntry, CertKind, ClientIdentity, TlsAgentConfig};
pub use cookie::{Cookie, SameSite, cookie_header, merge_cookies};
pub use error::DomainError;
pub use filter::{admits_host, contains_host};
pub use id::generate_id;
pub use proxy::{ProxyCredentials, ProxyEntry, ProxyProtocol, ResolvedProxy};
pub use request::{Header, HttpMethod, QueryParam, RequestConfig, append_query};
pub use response::{ExecutionResult, reason_phrase};
pub use settings::AppSettings;
