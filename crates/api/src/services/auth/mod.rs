//! Bearer token authentication.
//!
//! Tokens are opaque: 32 random bytes, URL-safe base64 encoded. Only the
//! SHA-256 digest of a token is ever stored, so a leaked token table cannot
//! be replayed.

mod error;

pub use error::AuthError;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use sneakersku_core::{Role, UserId};

const TOKEN_BYTES: usize = 32;

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub role: Role,
}

/// Resolves a presented credential to an [`Identity`].
#[async_trait]
pub trait AuthGate: Send + Sync {
    /// Resolve a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` for unknown or expired tokens and
    /// `AuthError::Unavailable` if the token store fails.
    async fn resolve(&self, token: &str) -> Result<Identity, AuthError>;
}

/// Extract the token from an `Authorization` header value.
///
/// The scheme is matched case-insensitively.
///
/// # Errors
///
/// Returns `AuthError::MalformedCredential` unless the value is
/// `Bearer <token>` with a non-empty token.
pub fn parse_bearer(header: &str) -> Result<&str, AuthError> {
    let (scheme, token) = header
        .trim()
        .split_once(' ')
        .ok_or(AuthError::MalformedCredential)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MalformedCredential);
    }

    let token = token.trim();
    if token.is_empty() || token.contains(char::is_whitespace) {
        return Err(AuthError::MalformedCredential);
    }
    Ok(token)
}

/// Generate a new random token.
#[must_use]
pub fn generate_token() -> String {
    let mut bytes = [0_u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Digest under which a token is stored.
#[must_use]
pub fn hash_token(token: &str) -> Vec<u8> {
    Sha256::digest(token.as_bytes()).to_vec()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bearer() {
        assert_eq!(parse_bearer("Bearer abc123").unwrap(), "abc123");
        assert_eq!(parse_bearer("bearer  abc123 ").unwrap(), "abc123");
    }

    #[test]
    fn test_parse_bearer_rejects_other_schemes() {
        assert!(matches!(
            parse_bearer("Basic dXNlcjpwYXNz"),
            Err(AuthError::MalformedCredential)
        ));
        assert!(matches!(
            parse_bearer("Bearer"),
            Err(AuthError::MalformedCredential)
        ));
        assert!(matches!(
            parse_bearer("Bearer "),
            Err(AuthError::MalformedCredential)
        ));
        assert!(matches!(
            parse_bearer("Bearer a b"),
            Err(AuthError::MalformedCredential)
        ));
    }

    #[test]
    fn test_generated_tokens_are_unique_and_url_safe() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(
            a.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_hash_is_stable_and_not_the_token() {
        let token = generate_token();
        assert_eq!(hash_token(&token), hash_token(&token));
        assert_eq!(hash_token(&token).len(), 32);
        assert_ne!(hash_token(&token), token.as_bytes());
    }

    #[test]
    fn test_only_outage_is_not_unauthenticated() {
        assert!(AuthError::InvalidToken.is_unauthenticated());
        assert!(AuthError::MissingCredential.is_unauthenticated());
        assert!(!AuthError::Unavailable("down".to_string()).is_unauthenticated());
    }
}
