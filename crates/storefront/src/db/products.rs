//! Product catalog repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use shopfront_core::{Price, Product, ProductFilter, ProductId};

use super::RepositoryError;

const PRODUCT_COLUMNS: &str = "id, title, name, description, img, price_org, price_mrp, \
                               price_off, sizes, category, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    title: String,
    name: String,
    description: String,
    img: Option<String>,
    price_org: Decimal,
    price_mrp: Decimal,
    price_off: Decimal,
    sizes: Vec<String>,
    category: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(r: ProductRow) -> Self {
        Self {
            id: r.id,
            title: r.title,
            name: r.name,
            desc: r.description,
            img: r.img,
            price: Price::new(r.price_org, r.price_mrp, r.price_off),
            sizes: r.sizes,
            category: r.category,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Escape `LIKE` metacharacters so the search term matches literally.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    /// Get every existing product among `ids`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        get_many_on(&mut conn, ids).await
    }

    /// Find products matching a filter, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE TRUE"));

        if !filter.categories.is_empty() {
            qb.push(" AND category && ").push_bind(filter.categories.clone());
        }
        if !filter.sizes.is_empty() {
            qb.push(" AND sizes && ").push_bind(filter.sizes.clone());
        }
        if let Some(min) = filter.min_price {
            qb.push(" AND price_org >= ").push_bind(min);
        }
        if let Some(max) = filter.max_price {
            qb.push(" AND price_org <= ").push_bind(max);
        }
        if let Some(term) = filter.search.as_deref() {
            let pattern = like_pattern(term);
            qb.push(" AND (title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        qb.push(" ORDER BY created_at, id");

        if let Some(limit) = filter.effective_limit() {
            qb.push(" LIMIT ").push_bind(i64::from(limit));
        }
        if let Some(offset) = filter.offset {
            qb.push(" OFFSET ").push_bind(i64::from(offset));
        }

        let rows = qb
            .build_query_as::<ProductRow>()
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Insert products in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` on a duplicate id.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn insert_all(&self, products: Vec<Product>) -> Result<Vec<Product>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        for p in &products {
            sqlx::query(
                r"
                INSERT INTO products
                    (id, title, name, description, img, price_org, price_mrp, price_off,
                     sizes, category, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                ",
            )
            .bind(p.id)
            .bind(&p.title)
            .bind(&p.name)
            .bind(&p.desc)
            .bind(&p.img)
            .bind(p.price.org)
            .bind(p.price.mrp)
            .bind(p.price.off)
            .bind(&p.sizes)
            .bind(&p.category)
            .bind(p.created_at)
            .bind(p.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| super::map_unique_violation(e, "product already exists"))?;
        }

        tx.commit().await?;
        Ok(products)
    }
}

/// Fetch existing products among `ids` on an existing connection or transaction.
pub(crate) async fn get_many_on(
    conn: &mut PgConnection,
    ids: &[ProductId],
) -> Result<Vec<Product>, RepositoryError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = ids.iter().map(ProductId::as_uuid).collect();
    let rows = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"
    ))
    .bind(ids)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(Product::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("shirt"), "%shirt%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern(r"a\b"), r"%a\\b%");
    }
}
