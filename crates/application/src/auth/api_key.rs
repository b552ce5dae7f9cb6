//! API key strategy.

use async_trait::async_trait;
use tracing::debug;
use waypoint_domain::{ApiKeySendIn, AuthError, AuthScheme};

use crate::placeholder::PlaceholderResolver;

use super::{AuthContext, AuthOutcome, AuthStrategy};

/// Sends a static key in a header or query parameter, with an optional
/// value prefix (e.g. `Bearer`).
#[derive(Debug, Default, Clone, Copy)]
pub struct ApiKeyStrategy;

#[async_trait]
impl AuthStrategy for ApiKeyStrategy {
    async fn apply_auth(&self, ctx: &AuthContext<'_>) -> Result<AuthOutcome, AuthError> {
        let AuthScheme::ApiKey {
            key,
            value,
            send_in,
            prefix,
        } = &ctx.entry.scheme
        else {
            return Err(AuthError::Validation(
                "credential is not an API key".to_string(),
            ));
        };

        let mut resolver = PlaceholderResolver::new(ctx.env_vars);
        let key = resolver.resolve(key);
        let value = resolver.resolve(value);
        let prefix = resolver.resolve_opt(prefix.as_deref());
        resolver.finish()?;

        if key.trim().is_empty() {
            return Err(AuthError::Validation("API key name is empty".to_string()));
        }

        let full_value = match prefix {
            Some(prefix) if !prefix.trim().is_empty() => format!("{prefix} {value}"),
            _ => value,
        };

        match send_in {
            ApiKeySendIn::Header => {
                if ctx.request.has_header(&key) {
                    debug!(header = %key, "request already carries the API key header, leaving it");
                    Ok(AuthOutcome::none())
                } else {
                    Ok(AuthOutcome::header(key, full_value))
                }
            }
            ApiKeySendIn::Query => Ok(AuthOutcome::query_param(key, full_value)),
        }
    }
}
