//! HTTP Digest strategy (RFC 2617 / RFC 7616 challenge-response).
//!
//! Digest cannot be expressed as additive request fields: computing the
//! `Authorization` header needs a server challenge, and the nonce count
//! must stay monotonic per credential. The strategy therefore owns the
//! whole exchange and returns the final response as a handled outcome.
//!
//! Flow per request, under the credential's lock:
//! 1. With cached challenge state, send directly with the next nonce
//!    count. On a `stale=true` 401, adopt the fresh nonce and retry
//!    once.
//! 2. Without cached state, probe unauthenticated, parse the Digest
//!    challenge from the 401, answer it, and cache the state for later
//!    requests.

use std::sync::Arc;

use async_trait::async_trait;
use md5::{Digest as _, Md5};
use rand::Rng as _;
use sha2::Sha256;
use tracing::debug;
use waypoint_domain::{AuthError, AuthScheme};

use crate::placeholder::PlaceholderResolver;
use crate::ports::{HttpTransport, TransportError, TransportRequest, TransportResponse};

use super::cache::{AuthCache, DigestState};
use super::{AuthContext, AuthOutcome, AuthStrategy};

/// Performs the Digest challenge-response exchange.
pub struct DigestStrategy {
    transport: Arc<dyn HttpTransport>,
    cache: Arc<AuthCache>,
}

impl DigestStrategy {
    /// Creates the strategy over the shared transport and cache.
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>, cache: Arc<AuthCache>) -> Self {
        Self { transport, cache }
    }

    async fn send_with_authorization(
        &self,
        ctx: &AuthContext<'_>,
        authorization: String,
    ) -> Result<TransportResponse, AuthError> {
        let request = ctx
            .request
            .clone()
            .with_header("Authorization", authorization);
        self.send(ctx, request).await
    }

    async fn send(
        &self,
        ctx: &AuthContext<'_>,
        request: TransportRequest,
    ) -> Result<TransportResponse, AuthError> {
        self.transport
            .perform(request, ctx.cancel.clone())
            .await
            .map_err(map_transport_error)
    }

    /// Answers a freshly parsed challenge and caches the follow-up
    /// state.
    async fn answer_challenge(
        &self,
        ctx: &AuthContext<'_>,
        credentials: &Credentials,
        challenge: DigestChallenge,
    ) -> Result<TransportResponse, AuthError> {
        let state = DigestState {
            realm: challenge.realm,
            nonce: challenge.nonce,
            nc: 1,
            opaque: challenge.opaque,
            algorithm: challenge.algorithm,
            qop: challenge.qop,
        };
        let authorization = build_authorization(
            credentials,
            ctx.request.method.as_str(),
            &ctx.request.request_uri(),
            &state,
            &generate_cnonce(),
        );
        let mut next = state;
        next.nc = 2;
        self.cache.store_digest(&ctx.entry.id, next).await;
        self.send_with_authorization(ctx, authorization).await
    }
}

#[async_trait]
impl AuthStrategy for DigestStrategy {
    async fn apply_auth(&self, ctx: &AuthContext<'_>) -> Result<AuthOutcome, AuthError> {
        let AuthScheme::Digest { username, password } = &ctx.entry.scheme else {
            return Err(AuthError::Validation(
                "credential is not a Digest credential".to_string(),
            ));
        };

        let mut resolver = PlaceholderResolver::new(ctx.env_vars);
        let credentials = Credentials {
            username: resolver.resolve(username),
            password: resolver.resolve(password),
        };
        resolver.finish()?;

        // Serializes the nonce count and any nonce refresh for this
        // credential across concurrent requests.
        let lock = self.cache.entry_lock(&ctx.entry.id).await;
        let _guard = lock.lock().await;

        if let Some(state) = self.cache.consume_digest_nonce(&ctx.entry.id).await {
            let authorization = build_authorization(
                &credentials,
                ctx.request.method.as_str(),
                &ctx.request.request_uri(),
                &state,
                &generate_cnonce(),
            );
            let response = self.send_with_authorization(ctx, authorization).await?;
            if response.status != 401 {
                return Ok(AuthOutcome::Handled { response });
            }
            match stale_challenge(&response)? {
                Some(challenge) => {
                    debug!(credential = %ctx.entry.id, "digest nonce went stale, retrying with fresh nonce");
                    let retried = self.answer_challenge(ctx, &credentials, challenge).await?;
                    return Ok(AuthOutcome::Handled { response: retried });
                }
                None => {
                    // Rejected outright; next attempt starts from a
                    // clean probe.
                    self.cache.clear_digest(&ctx.entry.id).await;
                    return Ok(AuthOutcome::Handled { response });
                }
            }
        }

        let probe = self.send(ctx, ctx.request.clone()).await?;
        if probe.status != 401 {
            return Ok(AuthOutcome::Handled { response: probe });
        }
        // A 401 may advertise several schemes, one header each; only a
        // Digest challenge is answerable.
        let Some(header) = digest_challenge_header(&probe) else {
            return Ok(AuthOutcome::Handled { response: probe });
        };
        let challenge = parse_challenge(header)?;
        let response = self.answer_challenge(ctx, &credentials, challenge).await?;
        Ok(AuthOutcome::Handled { response })
    }
}

struct Credentials {
    username: String,
    password: String,
}

fn map_transport_error(error: TransportError) -> AuthError {
    AuthError::Network(error.to_string())
}

/// A parsed `WWW-Authenticate: Digest` challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DigestChallenge {
    realm: String,
    nonce: String,
    stale: bool,
    opaque: Option<String>,
    algorithm: Option<String>,
    /// The qop token chosen for responses (`auth` when offered).
    qop: Option<String>,
}

fn is_digest_challenge(header: &str) -> bool {
    let trimmed = header.trim_start();
    trimmed
        .get(..6)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("digest"))
        && trimmed[6..].starts_with([' ', '\t'])
}

fn parse_challenge(header: &str) -> Result<DigestChallenge, AuthError> {
    let trimmed = header.trim();
    if !is_digest_challenge(trimmed) {
        return Err(AuthError::ChallengeParse(format!(
            "challenge scheme is not Digest: {trimmed}"
        )));
    }
    let params = parse_params(&trimmed[6..]);
    let find = |key: &str| {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    };

    let realm = find("realm")
        .ok_or_else(|| AuthError::ChallengeParse("challenge is missing realm".to_string()))?;
    let nonce = find("nonce")
        .ok_or_else(|| AuthError::ChallengeParse("challenge is missing nonce".to_string()))?;

    Ok(DigestChallenge {
        realm,
        nonce,
        stale: find("stale").is_some_and(|v| v.eq_ignore_ascii_case("true")),
        opaque: find("opaque"),
        algorithm: find("algorithm"),
        qop: choose_qop(find("qop").as_deref()),
    })
}

/// Splits comma-separated `key=value` pairs; quoted values may contain
/// commas.
fn parse_params(input: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let mut rest = input.trim_start();
    while let Some(eq) = rest.find('=') {
        let key = rest[..eq]
            .trim_matches(|c: char| c.is_ascii_whitespace() || c == ',')
            .to_ascii_lowercase();
        rest = rest[eq + 1..].trim_start();
        let value = if let Some(quoted) = rest.strip_prefix('"') {
            let Some(end) = quoted.find('"') else {
                params.push((key, quoted.to_string()));
                return params;
            };
            let value = quoted[..end].to_string();
            rest = &quoted[end + 1..];
            value
        } else {
            let end = rest.find(',').unwrap_or(rest.len());
            let value = rest[..end].trim().to_string();
            rest = rest.get(end..).unwrap_or("");
            value
        };
        if !key.is_empty() {
            params.push((key, value));
        }
        rest = rest.trim_start_matches(|c: char| c.is_ascii_whitespace() || c == ',');
    }
    params
}

fn choose_qop(offered: Option<&str>) -> Option<String> {
    let offered = offered?;
    let tokens: Vec<&str> = offered
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();
    if tokens.iter().any(|t| t.eq_ignore_ascii_case("auth")) {
        Some("auth".to_string())
    } else {
        tokens.first().map(|t| (*t).to_string())
    }
}

/// The first `WWW-Authenticate` value carrying a Digest challenge.
fn digest_challenge_header(response: &TransportResponse) -> Option<&str> {
    response
        .header_values("www-authenticate")
        .find(|header| is_digest_challenge(header))
}

/// Extracts a fresh challenge from a 401 only when it flags the
/// previous nonce as stale.
fn stale_challenge(response: &TransportResponse) -> Result<Option<DigestChallenge>, AuthError> {
    let Some(header) = digest_challenge_header(response) else {
        return Ok(None);
    };
    let challenge = parse_challenge(header)?;
    Ok(challenge.stale.then_some(challenge))
}

#[derive(Debug, Clone, Copy)]
enum HashAlgorithm {
    Md5,
    Sha256,
}

impl HashAlgorithm {
    fn from_challenge(algorithm: Option<&str>) -> Self {
        match algorithm {
            Some(a) if a.to_ascii_uppercase().starts_with("SHA-256") => Self::Sha256,
            _ => Self::Md5,
        }
    }

    fn hash(self, input: &str) -> String {
        match self {
            Self::Md5 => format!("{:x}", Md5::digest(input.as_bytes())),
            Self::Sha256 => format!("{:x}", Sha256::digest(input.as_bytes())),
        }
    }
}

fn is_session_variant(algorithm: Option<&str>) -> bool {
    algorithm.is_some_and(|a| a.to_ascii_uppercase().ends_with("-SESS"))
}

/// Computes the `response=` digest for one request.
fn compute_response(
    credentials: &Credentials,
    method: &str,
    uri: &str,
    state: &DigestState,
    cnonce: &str,
) -> String {
    let algorithm = HashAlgorithm::from_challenge(state.algorithm.as_deref());
    let mut ha1 = algorithm.hash(&format!(
        "{}:{}:{}",
        credentials.username, state.realm, credentials.password
    ));
    if is_session_variant(state.algorithm.as_deref()) {
        ha1 = algorithm.hash(&format!("{ha1}:{}:{cnonce}", state.nonce));
    }
    let ha2 = algorithm.hash(&format!("{method}:{uri}"));
    match state.qop.as_deref() {
        Some(qop) => algorithm.hash(&format!(
            "{ha1}:{}:{:08x}:{cnonce}:{qop}:{ha2}",
            state.nonce, state.nc
        )),
        None => algorithm.hash(&format!("{ha1}:{}:{ha2}", state.nonce)),
    }
}

/// Builds the full `Authorization: Digest` header value.
fn build_authorization(
    credentials: &Credentials,
    method: &str,
    uri: &str,
    state: &DigestState,
    cnonce: &str,
) -> String {
    let response = compute_response(credentials, method, uri, state, cnonce);
    let mut parts = vec![
        format!(r#"username="{}""#, credentials.username),
        format!(r#"realm="{}""#, state.realm),
        format!(r#"nonce="{}""#, state.nonce),
        format!(r#"uri="{uri}""#),
        format!(r#"response="{response}""#),
    ];
    if let Some(algorithm) = &state.algorithm {
        parts.push(format!("algorithm={algorithm}"));
    }
    if let Some(opaque) = &state.opaque {
        parts.push(format!(r#"opaque="{opaque}""#));
    }
    if let Some(qop) = &state.qop {
        parts.push(format!("qop={qop}"));
        parts.push(format!("nc={:08x}", state.nc));
        parts.push(format!(r#"cnonce="{cnonce}""#));
    }
    format!("Digest {}", parts.join(", "))
}

fn generate_cnonce() -> String {
    let mut rng = rand::rng();
    format!(
        "{:08x}{:08x}",
        rng.random::<u32>(),
        rng.random::<u32>()
    )
}
