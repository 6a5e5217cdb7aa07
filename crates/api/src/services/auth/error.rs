//! Authentication error types.

use thiserror::Error;

/// Errors that can occur while resolving a request's credential.
///
/// Everything except [`AuthError::Unavailable`] means the caller is not
/// authenticated.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No `Authorization` header was sent.
    #[error("missing credential")]
    MissingCredential,

    /// The header is not of the form `Bearer <token>`.
    #[error("malformed credential")]
    MalformedCredential,

    /// The token is unknown or expired.
    #[error("invalid or expired token")]
    InvalidToken,

    /// The token store could not be reached.
    #[error("auth store unavailable: {0}")]
    Unavailable(String),
}

impl AuthError {
    /// Whether this error means "not authenticated" rather than an outage.
    #[must_use]
    pub const fn is_unauthenticated(&self) -> bool {
        !matches!(self, Self::Unavailable(_))
    }
}
