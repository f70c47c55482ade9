//! Session and resolution error types.

use thiserror::Error;

/// Result type for registry operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors raised by [`TokenRegistry`](crate::TokenRegistry).
///
/// Only sign-in can fail. Lookups report absence through `Option`/`bool`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Sign-in refused because the limit for this user and type is zero.
    #[error("session limit exceeded: user '{user_id}' may not sign in with type '{token_type}'")]
    SessionLimitExceeded { user_id: String, token_type: String },
}

/// Errors reported by an [`AuthenticationSource`](crate::AuthenticationSource).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The backing store could not be reached.
    #[error("authentication source unavailable: {0}")]
    Unavailable(String),

    /// The backing store returned data that could not be turned into a model.
    #[error("invalid authentication data: {0}")]
    InvalidData(String),
}

/// Errors raised while resolving the current authentication.
///
/// "Nobody is signed in" is not an error; it resolves to `Ok(None)`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("authentication source failed: {0}")]
    Source(#[from] SourceError),
}
