//! Unified error handling with Sentry integration.
//!
//! All route handlers return `Result<T, AppError>`. Errors are rendered as
//!
//! ```json
//! { "success": false, "error": { "status": 404, "code": "PRODUCT_NOT_FOUND", "message": "Product not found" } }
//! ```
//!
//! Server-side failures are captured to Sentry before responding, and their
//! internal details never reach the client.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::services::{AuthError, CartError, OrderStoreError};

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Cart or checkout operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Credential missing, malformed, unknown or unverifiable.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Order history lookup failed.
    #[error("Order store error: {0}")]
    Orders(#[from] OrderStoreError),

    /// Authenticated, but an interceptor rejected the request.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Request body or path could not be parsed.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    success: bool,
    error: ErrorDetail<'a>,
}

#[derive(Debug, Serialize)]
struct ErrorDetail<'a> {
    status: u16,
    code: &'a str,
    message: String,
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Cart(err) => match err {
                CartError::ProductNotFound(_)
                | CartError::VariantNotFound { .. }
                | CartError::CartNotFound
                | CartError::LineNotFound { .. } => StatusCode::NOT_FOUND,
                CartError::EmptyCart | CartError::InvalidAddress(_) | CartError::InvalidQuantity => {
                    StatusCode::BAD_REQUEST
                }
                CartError::Conflict => StatusCode::CONFLICT,
                CartError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                CartError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Auth(AuthError::Unavailable(_)) | Self::Orders(OrderStoreError::Unavailable(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Orders(OrderStoreError::Corrupt(_)) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Cart(err) => err.code(),
            Self::Auth(AuthError::Unavailable(_)) | Self::Orders(OrderStoreError::Unavailable(_)) => {
                "STORE_UNAVAILABLE"
            }
            Self::Auth(_) => "UNAUTHENTICATED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::BadRequest(_) => "INVALID_REQUEST",
            Self::Orders(OrderStoreError::Corrupt(_)) | Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to show to the client.
    fn public_message(&self) -> String {
        let message = match self {
            Self::Cart(err) => match err {
                CartError::ProductNotFound(_) => "Product not found",
                CartError::VariantNotFound { .. } => "Variant not found",
                CartError::CartNotFound => "Cart not found",
                CartError::LineNotFound { .. } => "Item not found in cart",
                CartError::EmptyCart => "Cart is empty",
                CartError::InvalidAddress(_) => "Invalid address",
                CartError::InvalidQuantity => "Quantity is out of range",
                CartError::Conflict => "Cart was modified concurrently, please retry",
                CartError::StoreUnavailable(_) => "Service temporarily unavailable",
                CartError::Internal(_) => "Internal server error",
            },
            Self::Auth(AuthError::MissingCredential) => "Authentication required",
            Self::Auth(AuthError::MalformedCredential) => "Malformed authorization header",
            Self::Auth(AuthError::InvalidToken) => "Invalid or expired token",
            Self::Auth(AuthError::Unavailable(_)) | Self::Orders(OrderStoreError::Unavailable(_)) => {
                "Service temporarily unavailable"
            }
            Self::Forbidden(msg) | Self::BadRequest(msg) => msg.as_str(),
            Self::Orders(OrderStoreError::Corrupt(_)) | Self::Internal(_) => "Internal server error",
        };
        message.to_string()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                code = self.code(),
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, code = self.code(), "Request rejected");
        }

        let body = ErrorBody {
            success: false,
            error: ErrorDetail {
                status: status.as_u16(),
                code: self.code(),
                message: self.public_message(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for the authenticated caller.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}
