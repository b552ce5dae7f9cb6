//! Executor error types.

use thiserror::Error;
use waypoint_domain::AuthError;

/// Errors the executor surfaces to its caller.
///
/// Failures below the HTTP layer are not errors here; the executor
/// encodes them as `status = 0` results instead.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecutorError {
    /// The request configuration is invalid.
    #[error("invalid request: {0}")]
    Validation(String),
    /// Applying the referenced credential failed.
    #[error(transparent)]
    Auth(#[from] AuthError),
    /// The caller cancelled the request.
    #[error("request cancelled")]
    Cancelled,
}
