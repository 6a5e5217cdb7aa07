//! Cart and checkout route handlers.
//!
//! Transient failures (`STORE_UNAVAILABLE`, `CONFLICT`) are retried here with
//! the state's retry policy before being reported to the client.

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use sneakersku_core::{AddressId, Cart, CartLine, Money, OrderId, ProductId, UserId};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::services::CartError;
use crate::state::AppState;

// =============================================================================
// Request / Response Types
// =============================================================================

/// Body of `POST /cart/items`.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub shoe_id: ProductId,
    pub variant_key: String,
    /// Defaults to 1.
    pub quantity: Option<u32>,
}

/// Body of `PUT /cart/items/{shoe_id}/{variant_key}`.
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: u32,
}

/// Body of `POST /cart/checkout`.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub address_id: AddressId,
}

/// Response of a successful checkout.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub message: &'static str,
    pub order_id: OrderId,
}

/// Cart as returned to clients.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub cart_id: Uuid,
    pub user_id: UserId,
    pub items: Vec<CartItemView>,
    pub item_count: u64,
    pub total: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One cart line as returned to clients.
#[derive(Debug, Serialize)]
pub struct CartItemView {
    pub shoe_id: ProductId,
    pub variant_key: String,
    pub name: String,
    pub quantity: u32,
    pub price: Money,
    pub line_total: Money,
}

impl From<&CartLine> for CartItemView {
    fn from(line: &CartLine) -> Self {
        Self {
            shoe_id: line.product_id,
            variant_key: line.variant_key.clone(),
            name: line.display_name.clone(),
            quantity: line.quantity,
            price: line.unit_price,
            line_total: line.line_total(),
        }
    }
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            cart_id: cart.cart_id(),
            user_id: cart.owner_id().clone(),
            items: cart.lines().iter().map(CartItemView::from).collect(),
            item_count: cart.item_count(),
            total: cart.total(),
            created_at: cart.created_at(),
            updated_at: cart.updated_at(),
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Show the caller's cart.
#[instrument(skip_all, fields(user_id = %identity.user_id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
) -> Result<Json<CartView>> {
    let owner = &identity.user_id;
    let cart = state
        .retry()
        .run(|| state.carts().get_cart(owner), CartError::is_retryable)
        .await?;

    Ok(Json(CartView::from(&cart)))
}

/// Add a product variant to the caller's cart.
#[instrument(skip_all, fields(user_id = %identity.user_id))]
pub async fn add_item(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
    payload: std::result::Result<Json<AddItemRequest>, JsonRejection>,
) -> Result<Json<CartView>> {
    let Json(request) = payload?;
    let owner = &identity.user_id;
    let quantity = request.quantity.unwrap_or(1);

    let cart = state
        .retry()
        .run(
            || {
                state
                    .carts()
                    .add_item(owner, request.shoe_id, &request.variant_key, quantity)
            },
            CartError::is_retryable,
        )
        .await?;

    Ok(Json(CartView::from(&cart)))
}

/// Set the quantity of a line in the caller's cart.
#[instrument(skip_all, fields(user_id = %identity.user_id))]
pub async fn update_item(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
    path: std::result::Result<Path<(ProductId, String)>, PathRejection>,
    payload: std::result::Result<Json<UpdateItemRequest>, JsonRejection>,
) -> Result<Json<CartView>> {
    let Path((shoe_id, variant_key)) = path?;
    let Json(request) = payload?;
    let owner = &identity.user_id;

    let cart = state
        .retry()
        .run(
            || {
                state
                    .carts()
                    .update_quantity(owner, shoe_id, &variant_key, request.quantity)
            },
            CartError::is_retryable,
        )
        .await?;

    Ok(Json(CartView::from(&cart)))
}

/// Discard the caller's cart.
#[instrument(skip_all, fields(user_id = %identity.user_id))]
pub async fn clear(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
) -> Result<StatusCode> {
    let owner = &identity.user_id;
    state
        .retry()
        .run(|| state.carts().clear(owner), CartError::is_retryable)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Place an order from the caller's cart.
///
/// Safe to retry: a cart that already produced an order resolves to that
/// order instead of creating another.
#[instrument(skip_all, fields(user_id = %identity.user_id))]
pub async fn checkout(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
    payload: std::result::Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<Json<CheckoutResponse>> {
    let Json(request) = payload?;
    let owner = &identity.user_id;

    let order_id = state
        .retry()
        .run(
            || state.checkout().checkout(owner, request.address_id),
            CartError::is_retryable,
        )
        .await?;

    Ok(Json(CheckoutResponse {
        message: "Checkout successful",
        order_id,
    }))
}
