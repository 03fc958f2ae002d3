//! Seed the catalog from a JSON file.
//!
//! The file holds a JSON array in the same shape as the `POST /products`
//! request body. Every entry is validated before anything is inserted.

use std::path::Path;

use thiserror::Error;
use tracing::info;

use shopfront_core::NewProduct;
use shopfront_storefront::db::{self, PgStore};
use shopfront_storefront::services::catalog::{CatalogError, CatalogService};

/// Errors from seeding the catalog.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Could not read products file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Products file is not a JSON array of products: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

/// Parse a products file.
pub(crate) fn parse_products(content: &str) -> Result<Vec<NewProduct>, serde_json::Error> {
    serde_json::from_str(content)
}

/// Validate every entry without touching the database.
fn check_products(products: &[NewProduct]) -> Result<(), SeedError> {
    for (index, product) in products.iter().enumerate() {
        product
            .validate()
            .map_err(|source| CatalogError::InvalidProduct { index, source })?;
    }
    Ok(())
}

/// Insert the products listed in `file_path`, or only validate them when
/// `check_only` is set.
///
/// # Errors
///
/// Returns `SeedError` if the file cannot be read or parsed, an entry is
/// invalid, the database URL is missing, or the insert fails.
pub async fn products(file_path: &str, check_only: bool) -> Result<(), SeedError> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(SeedError::FileNotFound(file_path.to_owned()));
    }

    info!(path = %file_path, "Loading products from file");

    // Parse before connecting to the database
    let content = tokio::fs::read_to_string(path).await?;
    let products = parse_products(&content)?;
    info!(count = products.len(), "Parsed products");

    if check_only {
        check_products(&products)?;
        info!(count = products.len(), "All products are valid, nothing inserted");
        return Ok(());
    }

    let database_url = super::database_url().map_err(SeedError::MissingEnvVar)?;
    let pool = db::create_pool(&database_url).await?;
    info!("Connected to database");

    let store = PgStore::new(pool);
    let created = CatalogService::new(&store).add_products(products).await?;

    info!(inserted = created.len(), "Seeding complete");
    Ok(())
}
