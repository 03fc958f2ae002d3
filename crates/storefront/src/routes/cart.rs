//! Cart route handlers.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use shopfront_core::ProductId;

use crate::error::Result;
use crate::extract::ApiJson;
use crate::middleware::RequireAuth;
use crate::models::cart::CartEntry;
use crate::models::user::{UserAggregate, UserView};
use crate::services::cart::CartService;
use crate::state::AppState;

/// Body for adding to the cart.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

const fn default_quantity() -> i64 {
    1
}

/// Body for removing from the cart. Without `quantity` the line is deleted.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveFromCartRequest {
    pub product_id: ProductId,
    pub quantity: Option<i64>,
}

/// Message plus the updated user, returned by cart and favorite mutations.
#[derive(Debug, Serialize)]
pub struct UserUpdate {
    pub message: &'static str,
    pub user: UserView,
}

impl UserUpdate {
    pub(crate) fn new(message: &'static str, aggregate: UserAggregate) -> Self {
        Self {
            message,
            user: aggregate.into(),
        }
    }
}

/// GET /user/cart
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<CartEntry>>> {
    let entries = CartService::new(state.store()).list_cart(user).await?;
    Ok(Json(entries))
}

/// POST /user/cart
#[instrument(skip(state, body))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<AddToCartRequest>,
) -> Result<Json<UserUpdate>> {
    let aggregate = CartService::new(state.store())
        .add_to_cart(user, body.product_id, body.quantity)
        .await?;
    Ok(Json(UserUpdate::new(
        "Product added to cart successfully",
        aggregate,
    )))
}

/// DELETE /user/cart
#[instrument(skip(state, body))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<RemoveFromCartRequest>,
) -> Result<Json<UserUpdate>> {
    let aggregate = CartService::new(state.store())
        .remove_from_cart(user, body.product_id, body.quantity)
        .await?;
    Ok(Json(UserUpdate::new(
        "Product quantity updated in cart",
        aggregate,
    )))
}
