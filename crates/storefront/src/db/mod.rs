//! Storage for users, carts, favorites, orders and the product catalog.
//!
//! # Backends
//!
//! - [`PgStore`] - `PostgreSQL` via sqlx (production)
//! - [`MemoryStore`] - process-local maps (local development and tests)
//!
//! Both implement the same store traits and delegate every cart and checkout
//! decision to the pure rules in `shopfront_core`, so they differ only in how
//! they serialize writers: a row lock on `users` for Postgres, a per-user
//! mutex in memory.
//!
//! ## Tables
//!
//! - `users` - Accounts (aggregate root, locked for every cart/order write)
//! - `products` - Catalog
//! - `cart_items` - One row per (user, product)
//! - `favorites` - Favorited products
//! - `orders` / `order_items` - Placed orders with price snapshots
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p shopfront-cli -- migrate
//! ```

pub mod cart;
pub mod memory;
pub mod orders;
pub mod products;
pub mod users;

#[cfg(test)]
mod test_support;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use tracing::info;

use shopfront_core::{
    CartError, CartMutation, CheckoutError, DeliveryAddress, Email, Order, Product, ProductFilter,
    ProductId, UserId,
};

pub use memory::MemoryStore;

use crate::config::StorageConfig;
use crate::models::user::{NewUser, User, UserAggregate};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Errors from a cart or favorite write.
#[derive(Debug, Error)]
pub enum CartWriteError {
    #[error("user not found")]
    UserNotFound,
    #[error(transparent)]
    Rule(#[from] CartError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for CartWriteError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// Errors from placing an order.
#[derive(Debug, Error)]
pub enum OrderWriteError {
    #[error("user not found")]
    UserNotFound,
    #[error(transparent)]
    Checkout(#[from] CheckoutError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for OrderWriteError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// What the client asked for at checkout.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub address: DeliveryAddress,
    pub idempotency_key: Option<String>,
}

/// Result of an order placement.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: Order,
    /// `true` when an earlier order with the same idempotency key was returned
    /// instead of placing a new one.
    pub replayed: bool,
}

// =============================================================================
// Store traits
// =============================================================================

/// Account storage.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create a user.
    ///
    /// Returns `RepositoryError::Conflict` if the email is already registered.
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError>;

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Look up a user and their password hash by email.
    async fn get_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;
}

/// Product catalog storage.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Fetch the products that still exist among `ids`. Missing ids are skipped.
    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError>;

    /// Products matching `filter`, oldest first.
    async fn find_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError>;

    /// Insert already-validated products, all or nothing.
    async fn insert_products(&self, products: Vec<Product>)
    -> Result<Vec<Product>, RepositoryError>;
}

/// The user aggregate: cart and favorites.
///
/// Writes to one user's aggregate are serialized by the backend.
#[async_trait]
pub trait CartStore: Send + Sync {
    async fn load_aggregate(&self, user: UserId)
    -> Result<Option<UserAggregate>, RepositoryError>;

    /// Apply `mutation` to the user's cart and return the updated aggregate.
    async fn apply_cart(
        &self,
        user: UserId,
        mutation: CartMutation,
    ) -> Result<UserAggregate, CartWriteError>;

    /// Add (`favorite = true`) or remove a favorite. Both directions are idempotent.
    async fn set_favorite(
        &self,
        user: UserId,
        product: ProductId,
        favorite: bool,
    ) -> Result<UserAggregate, CartWriteError>;
}

/// Order storage.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Turn the user's current cart into an order and empty the cart, atomically.
    async fn place_order(
        &self,
        user: UserId,
        request: OrderRequest,
    ) -> Result<PlacedOrder, OrderWriteError>;

    /// The user's orders, newest first.
    async fn list_orders(&self, user: UserId) -> Result<Vec<Order>, RepositoryError>;
}

/// Everything the storefront persists.
#[async_trait]
pub trait Store: UserStore + CatalogStore + CartStore + OrderStore {
    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

// =============================================================================
// Postgres
// =============================================================================

/// `PostgreSQL` implementation of [`Store`].
///
/// Each trait method delegates to the repository for its table group.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        users::UserRepository::new(&self.pool).create(&user).await
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        users::UserRepository::new(&self.pool).get_by_id(id).await
    }

    async fn get_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        users::UserRepository::new(&self.pool)
            .get_password_hash(email)
            .await
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        products::ProductRepository::new(&self.pool)
            .get_by_id(id)
            .await
    }

    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        products::ProductRepository::new(&self.pool)
            .get_many(ids)
            .await
    }

    async fn find_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        products::ProductRepository::new(&self.pool)
            .find(filter)
            .await
    }

    async fn insert_products(
        &self,
        products: Vec<Product>,
    ) -> Result<Vec<Product>, RepositoryError> {
        products::ProductRepository::new(&self.pool)
            .insert_all(products)
            .await
    }
}

#[async_trait]
impl CartStore for PgStore {
    async fn load_aggregate(
        &self,
        user: UserId,
    ) -> Result<Option<UserAggregate>, RepositoryError> {
        cart::CartRepository::new(&self.pool).load(user).await
    }

    async fn apply_cart(
        &self,
        user: UserId,
        mutation: CartMutation,
    ) -> Result<UserAggregate, CartWriteError> {
        cart::CartRepository::new(&self.pool)
            .apply(user, mutation)
            .await
    }

    async fn set_favorite(
        &self,
        user: UserId,
        product: ProductId,
        favorite: bool,
    ) -> Result<UserAggregate, CartWriteError> {
        cart::CartRepository::new(&self.pool)
            .set_favorite(user, product, favorite)
            .await
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn place_order(
        &self,
        user: UserId,
        request: OrderRequest,
    ) -> Result<PlacedOrder, OrderWriteError> {
        orders::OrderRepository::new(&self.pool)
            .place(user, request)
            .await
    }

    async fn list_orders(&self, user: UserId) -> Result<Vec<Order>, RepositoryError> {
        orders::OrderRepository::new(&self.pool)
            .list_for_user(user)
            .await
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Build the configured storage backend.
///
/// # Errors
///
/// Returns `sqlx::Error` if the Postgres pool cannot be created.
pub async fn init_store(config: &StorageConfig) -> Result<Arc<dyn Store>, sqlx::Error> {
    match config {
        StorageConfig::Postgres { database_url } => {
            let pool = create_pool(database_url).await?;
            info!("Storage: postgres");
            Ok(Arc::new(PgStore::new(pool)))
        }
        StorageConfig::Memory => {
            info!("Storage: memory (state is lost on restart)");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Map a unique-constraint violation to `RepositoryError::Conflict`.
pub(crate) fn map_unique_violation(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(what.to_owned());
    }
    RepositoryError::Database(e)
}
