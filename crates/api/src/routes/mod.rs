//! HTTP route handlers for the API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                              - Liveness check
//! GET    /health/ready                        - Readiness check (order store)
//!
//! # Cart (requires auth, role user or admin)
//! GET    /cart                                - Current cart (empty if none)
//! DELETE /cart                                - Discard the cart
//! POST   /cart/items                          - Add a product variant
//! PUT    /cart/items/{shoe_id}/{variant_key}  - Set a line's quantity (0 removes)
//! POST   /cart/checkout                       - Place an order from the cart
//!
//! # Orders (requires auth, role user or admin)
//! GET    /orders                              - Order history, newest first
//! ```

pub mod cart;
pub mod orders;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post, put},
};

use sneakersku_core::Role;

use crate::middleware::{InterceptorChain, authenticate, enforce, require_role};
use crate::state::AppState;

const SHOPPER_ROLES: &[Role] = &[Role::User, Role::Admin];

/// Create the authenticated cart and order routes.
pub fn routes(state: &AppState) -> Router<AppState> {
    let shopper = InterceptorChain::new().then(require_role(SHOPPER_ROLES));

    Router::new()
        .route("/cart", get(cart::show).delete(cart::clear))
        .route("/cart/items", post(cart::add_item))
        .route(
            "/cart/items/{shoe_id}/{variant_key}",
            put(cart::update_item),
        )
        .route("/cart/checkout", post(cart::checkout))
        .route("/orders", get(orders::list))
        // Layers run bottom-up: authenticate, then the interceptor chain.
        .route_layer(from_fn_with_state(shopper, enforce))
        .route_layer(from_fn_with_state(state.clone(), authenticate))
}
