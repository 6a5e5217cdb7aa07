//! HTTP middleware stack for the API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span with `request_id` and `user_id` fields)
//! 3. Request ID (add unique ID to each request)
//! 4. Authentication (resolve bearer token to an `Identity`), protected routes only
//! 5. Interceptor chain (role gating), protected routes only

pub mod auth;
pub mod interceptor;
pub mod request_id;

pub use auth::{RequireAuth, authenticate};
pub use interceptor::{InterceptorChain, Rejection, RequestInfo, enforce, require_role};
pub use request_id::request_id_middleware;
