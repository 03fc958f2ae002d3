//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health               - Liveness check
//! GET    /health/ready         - Readiness check (store reachable)
//!
//! # Identity
//! POST   /user/signup          - Register, returns {token, user}
//! POST   /user/signin          - Login, returns {token, user}
//!
//! # Cart (bearer token)
//! GET    /user/cart            - Cart lines with resolved products
//! POST   /user/cart            - Add to cart
//! DELETE /user/cart            - Decrement or delete a line
//!
//! # Favorites (bearer token)
//! GET    /user/favorite        - Favorites with resolved products
//! POST   /user/favorite        - Add favorite
//! DELETE /user/favorite        - Remove favorite
//!
//! # Orders (bearer token)
//! GET    /user/order           - Order history, newest first
//! POST   /user/order           - Place an order from the cart
//!
//! # Catalog
//! GET    /products             - Filtered product listing
//! POST   /products             - Add products
//! GET    /products/{id}        - Product detail
//! ```

pub mod cart;
pub mod favorites;
pub mod orders;
pub mod products;
pub mod users;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Create the identity routes router.
///
/// Signup and signin are rate limited per client IP when enabled.
pub fn user_auth_routes(rate_limit: bool) -> Router<AppState> {
    let router = Router::new()
        .route("/signup", post(users::signup))
        .route("/signin", post(users::signin));

    match rate_limit.then(auth_rate_limiter).flatten() {
        Some(layer) => router.layer(layer),
        None => {
            if rate_limit {
                tracing::warn!("auth rate limiter could not be built; continuing without it");
            }
            router
        }
    }
}

/// Create the authenticated user routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/cart",
            get(cart::list).post(cart::add).delete(cart::remove),
        )
        .route(
            "/favorite",
            get(favorites::list)
                .post(favorites::add)
                .delete(favorites::remove),
        )
        .route("/order", get(orders::list).post(orders::place))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route("/{id}", get(products::show))
}

/// Create all routes for the storefront.
pub fn routes(rate_limit: bool) -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/user", user_auth_routes(rate_limit).merge(user_routes()))
        .nest("/products", product_routes())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
