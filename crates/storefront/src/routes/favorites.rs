//! Favorite route handlers.

use axum::{Json, extract::State};
use serde::Deserialize;
use tracing::instrument;

use shopfront_core::ProductId;

use super::cart::UserUpdate;
use crate::error::Result;
use crate::extract::ApiJson;
use crate::middleware::RequireAuth;
use crate::models::cart::FavoriteEntry;
use crate::services::cart::CartService;
use crate::state::AppState;

/// Body for adding or removing a favorite.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteRequest {
    pub product_id: ProductId,
}

/// GET /user/favorite
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<FavoriteEntry>>> {
    let entries = CartService::new(state.store()).list_favorites(user).await?;
    Ok(Json(entries))
}

/// POST /user/favorite
#[instrument(skip(state, body))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<FavoriteRequest>,
) -> Result<Json<UserUpdate>> {
    let aggregate = CartService::new(state.store())
        .toggle_favorite(user, body.product_id, true)
        .await?;
    Ok(Json(UserUpdate::new(
        "Product added to favorites successfully",
        aggregate,
    )))
}

/// DELETE /user/favorite
#[instrument(skip(state, body))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<FavoriteRequest>,
) -> Result<Json<UserUpdate>> {
    let aggregate = CartService::new(state.store())
        .toggle_favorite(user, body.product_id, false)
        .await?;
    Ok(Json(UserUpdate::new(
        "Product removed from favorites successfully",
        aggregate,
    )))
}
