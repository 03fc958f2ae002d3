//! Product route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;
use tracing::instrument;

use shopfront_core::{NewProduct, Product};

use crate::error::Result;
use crate::extract::{ApiJson, ApiQuery};
use crate::services::catalog::{CatalogService, ProductQuery};
use crate::state::AppState;

/// Response for a batch of created products.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedProducts {
    pub message: &'static str,
    pub created_products: Vec<Product>,
}

/// GET /products
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> Result<Json<Vec<Product>>> {
    let filter = query.into_filter()?;
    let products = CatalogService::new(state.store())
        .find_products(&filter)
        .await?;
    Ok(Json(products))
}

/// POST /products
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Vec<NewProduct>>,
) -> Result<(StatusCode, Json<CreatedProducts>)> {
    let created = CatalogService::new(state.store())
        .add_products(body)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedProducts {
            message: "Products added successfully",
            created_products: created,
        }),
    ))
}

/// GET /products/{id}
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Product>> {
    let product = CatalogService::new(state.store()).get_product(&id).await?;
    Ok(Json(product))
}
