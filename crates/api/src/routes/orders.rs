//! Order history.

use axum::{Json, extract::State};
use tracing::instrument;

use sneakersku_core::Order;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// List the caller's orders, newest first.
#[instrument(skip_all, fields(user_id = %identity.user_id))]
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
) -> Result<Json<Vec<Order>>> {
    let orders = state.orders().list_orders(&identity.user_id).await?;
    Ok(Json(orders))
}
