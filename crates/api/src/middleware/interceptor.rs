//! Request interceptors.
//!
//! An [`InterceptorChain`] is an ordered list of checks run after
//! authentication and before the handler. Each interceptor sees the caller's
//! [`Identity`] and a summary of the request and either lets it through or
//! rejects it. The first rejection wins; later interceptors do not run.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};

use sneakersku_core::Role;

use crate::error::AppError;
use crate::services::{AuthError, Identity};

const INSUFFICIENT_PERMISSIONS: &str = "Insufficient permissions to access this resource";

/// What an interceptor may inspect about the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestInfo {
    pub method: Method,
    pub path: String,
}

impl RequestInfo {
    fn of(request: &Request) -> Self {
        Self {
            method: request.method().clone(),
            path: request.uri().path().to_owned(),
        }
    }
}

/// Why an interceptor refused a request. Rendered as 403.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub message: String,
}

impl Rejection {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<Rejection> for AppError {
    fn from(rejection: Rejection) -> Self {
        Self::Forbidden(rejection.message)
    }
}

type Interceptor = dyn Fn(&Identity, &RequestInfo) -> Result<(), Rejection> + Send + Sync;

/// Ordered interceptors, applied first to last.
#[derive(Clone, Default)]
pub struct InterceptorChain {
    interceptors: Vec<Arc<Interceptor>>,
}

impl InterceptorChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an interceptor to the end of the chain.
    #[must_use]
    pub fn then<F>(mut self, interceptor: F) -> Self
    where
        F: Fn(&Identity, &RequestInfo) -> Result<(), Rejection> + Send + Sync + 'static,
    {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Run every interceptor in order, stopping at the first rejection.
    ///
    /// # Errors
    ///
    /// Returns the first interceptor's `Rejection`.
    pub fn check(&self, identity: &Identity, request: &RequestInfo) -> Result<(), Rejection> {
        self.interceptors
            .iter()
            .try_for_each(|interceptor| interceptor(identity, request))
    }
}

/// Interceptor that admits only callers holding one of `allowed`.
pub fn require_role(
    allowed: &'static [Role],
) -> impl Fn(&Identity, &RequestInfo) -> Result<(), Rejection> + Send + Sync + 'static {
    move |identity, request| {
        if allowed.contains(&identity.role) {
            Ok(())
        } else {
            tracing::info!(
                user_id = %identity.user_id,
                role = %identity.role,
                method = %request.method,
                path = %request.path,
                "Role not permitted"
            );
            Err(Rejection::new(INSUFFICIENT_PERMISSIONS))
        }
    }
}

/// Middleware applying `chain` to the authenticated request.
///
/// Must be layered inside [`authenticate`](super::authenticate).
///
/// # Errors
///
/// Returns `AppError::Forbidden` on rejection, or 401 if no identity is present.
pub async fn enforce(
    State(chain): State<InterceptorChain>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = request
        .extensions()
        .get::<Identity>()
        .ok_or(AppError::Auth(AuthError::MissingCredential))?;

    chain.check(identity, &RequestInfo::of(&request))?;
    Ok(next.run(request).await)
}
