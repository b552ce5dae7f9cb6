//! HTTP Basic strategy.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tracing::debug;
use waypoint_domain::{AuthError, AuthScheme};

use crate::placeholder::PlaceholderResolver;

use super::{AuthContext, AuthOutcome, AuthStrategy};

/// Adds an `Authorization: Basic` header built from the stored
/// username and password.
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicStrategy;

#[async_trait]
impl AuthStrategy for BasicStrategy {
    async fn apply_auth(&self, ctx: &AuthContext<'_>) -> Result<AuthOutcome, AuthError> {
        let AuthScheme::Basic { username, password } = &ctx.entry.scheme else {
            return Err(AuthError::Validation(
                "credential is not a Basic credential".to_string(),
            ));
        };

        let mut resolver = PlaceholderResolver::new(ctx.env_vars);
        let username = resolver.resolve(username);
        let password = resolver.resolve(password);
        resolver.finish()?;

        if ctx.request.has_header("authorization") {
            debug!("request already carries an Authorization header, leaving it");
            return Ok(AuthOutcome::none());
        }

        let encoded = STANDARD.encode(format!("{username}:{password}"));
        Ok(AuthOutcome::header("Authorization", format!("Basic {encoded}")))
    }
}
