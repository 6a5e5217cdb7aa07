//! Bearer token authentication middleware and extractor.
//!
//! [`authenticate`] runs in front of every protected route: it resolves the
//! `Authorization: Bearer <token>` header through the [`AuthGate`] and stores
//! the resulting [`Identity`] in the request extensions. Handlers then take
//! [`RequireAuth`] to get at it.
//!
//! [`AuthGate`]: crate::services::AuthGate

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use tracing::Span;

use crate::error::{AppError, set_sentry_user};
use crate::services::auth::parse_bearer;
use crate::services::{AuthError, Identity};
use crate::state::AppState;

/// Resolve the caller's bearer token before any cart logic runs.
///
/// # Errors
///
/// Returns `AppError::Auth` (401) if the header is missing, malformed, or
/// the token is unknown or expired, and 503 if the token store is down.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingCredential)?
        .to_str()
        .map_err(|_| AuthError::MalformedCredential)?;
    let token = parse_bearer(header)?.to_owned();

    let identity = state.auth().resolve(&token).await.inspect_err(|err| {
        if err.is_unauthenticated() {
            tracing::debug!(error = %err, "Rejected bearer token");
        }
    })?;

    Span::current().record("user_id", identity.user_id.as_str());
    set_sentry_user(&identity.user_id);

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Extractor for the authenticated caller.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(identity): RequireAuth) -> String {
///     format!("Hello, {}!", identity.user_id)
/// }
/// ```
pub struct RequireAuth(pub Identity);

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Set by `authenticate`; absent means the route was not protected.
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(Self)
            .ok_or(AppError::Auth(AuthError::MissingCredential))
    }
}
