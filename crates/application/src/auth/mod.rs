//! The pluggable authentication engine.
//!
//! Each supported scheme is a strategy behind the [`AuthStrategy`]
//! trait. Simple strategies return additive request fields; the Digest
//! strategy performs the exchange itself and returns the final
//! response. The [`AuthEngine`] dispatches on the credential's scheme
//! and owns the shared [`AuthCache`].

mod api_key;
mod basic;
mod cache;
mod digest;
mod engine;
mod oauth2;

use std::collections::HashMap;

use async_trait::async_trait;
use waypoint_domain::{AuthEntry, AuthError, QueryParam};

use crate::ports::{CancellationToken, TransportRequest, TransportResponse};

pub use api_key::ApiKeyStrategy;
pub use basic::BasicStrategy;
pub use cache::{AuthCache, CachedToken, DigestState};
pub use digest::DigestStrategy;
pub use engine::AuthEngine;
pub use oauth2::OAuth2RefreshStrategy;

/// Everything a strategy needs to apply one credential to one request.
#[derive(Debug, Clone, Copy)]
pub struct AuthContext<'a> {
    /// The stored credential being applied.
    pub entry: &'a AuthEntry,
    /// The prepared outgoing request, before authentication.
    pub request: &'a TransportRequest,
    /// Environment variables for placeholder resolution.
    pub env_vars: &'a HashMap<String, String>,
    /// Cancellation observed by any network calls the strategy makes.
    pub cancel: &'a CancellationToken,
}

/// What applying a credential produced.
#[derive(Debug, Clone)]
pub enum AuthOutcome {
    /// Additive fields the executor merges into the outgoing request.
    Augment {
        /// Headers to add. Existing headers are never overwritten.
        headers: Vec<(String, String)>,
        /// Query parameters to append to the URL.
        query_params: Vec<QueryParam>,
    },
    /// The strategy performed the exchange itself; this is the final
    /// response.
    Handled {
        /// The response to hand back to the caller.
        response: TransportResponse,
    },
}

impl AuthOutcome {
    /// An outcome that changes nothing.
    #[must_use]
    pub const fn none() -> Self {
        Self::Augment {
            headers: Vec::new(),
            query_params: Vec::new(),
        }
    }

    /// An outcome adding a single header.
    #[must_use]
    pub fn header(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Augment {
            headers: vec![(name.into(), value.into())],
            query_params: Vec::new(),
        }
    }

    /// An outcome appending a single query parameter.
    #[must_use]
    pub fn query_param(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Augment {
            headers: Vec::new(),
            query_params: vec![QueryParam::new(name, value)],
        }
    }
}

/// A single authentication scheme.
#[async_trait]
pub trait AuthStrategy: Send + Sync {
    /// Applies the credential in `ctx` to the outgoing request.
    async fn apply_auth(&self, ctx: &AuthContext<'_>) -> Result<AuthOutcome, AuthError>;
}
