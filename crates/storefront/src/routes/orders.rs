//! Order route handlers.

use axum::{Json, extract::State, http::HeaderMap};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use shopfront_core::{DeliveryAddress, Order};

use crate::error::{AppError, Result};
use crate::extract::ApiJson;
use crate::middleware::RequireAuth;
use crate::services::orders::OrderService;
use crate::state::AppState;

/// Header carrying the client's idempotency key.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Body for placing an order.
///
/// `products` and `totalAmount` are accepted for compatibility. The order is
/// always built from the stored cart and current prices.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub address: DeliveryAddress,
    #[serde(default)]
    pub products: Option<serde_json::Value>,
    #[serde(default)]
    pub total_amount: Option<Decimal>,
}

/// Response for a placed order.
#[derive(Debug, Serialize)]
pub struct PlaceOrderResponse {
    pub message: &'static str,
    pub order: Order,
}

fn idempotency_key(headers: &HeaderMap) -> Result<Option<String>> {
    headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .map(|v| {
            v.to_str()
                .map(str::to_owned)
                .map_err(|_| AppError::BadRequest("invalid Idempotency-Key header".to_owned()))
        })
        .transpose()
}

/// GET /user/order
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Order>>> {
    let orders = OrderService::new(state.store()).list_orders(user).await?;
    Ok(Json(orders))
}

/// POST /user/order
#[instrument(skip(state, headers, body))]
pub async fn place(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    headers: HeaderMap,
    ApiJson(body): ApiJson<PlaceOrderRequest>,
) -> Result<Json<PlaceOrderResponse>> {
    let key = idempotency_key(&headers)?;
    let placed = OrderService::new(state.store())
        .place_order(user, body.address, key, body.total_amount)
        .await?;
    Ok(Json(PlaceOrderResponse {
        message: "Order placed successfully",
        order: placed.order,
    }))
}
