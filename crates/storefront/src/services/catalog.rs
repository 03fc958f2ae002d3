//! Catalog queries and product creation.

use std::str::FromStr;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use shopfront_core::{IdError, NewProduct, Product, ProductError, ProductFilter, ProductId};

use crate::db::{RepositoryError, Store};

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid product id: {0}")]
    InvalidIdentifier(IdError),
    #[error("product not found")]
    ProductNotFound,
    #[error("product {index}: {source}")]
    InvalidProduct {
        index: usize,
        #[source]
        source: ProductError,
    },
    #[error("{0}")]
    InvalidFilter(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Raw catalog query string.
///
/// Every value arrives as text so bad numbers surface as a validation error
/// instead of an extractor rejection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    pub categories: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub sizes: Option<String>,
    pub search: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl ProductQuery {
    /// Parse into a [`ProductFilter`].
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidFilter` if a numeric parameter does not
    /// parse, a price is negative, or the price range is inverted.
    pub fn into_filter(self) -> Result<ProductFilter, CatalogError> {
        let min_price = parse_param::<Decimal>("minPrice", self.min_price.as_deref())?;
        let max_price = parse_param::<Decimal>("maxPrice", self.max_price.as_deref())?;
        if [min_price, max_price]
            .iter()
            .flatten()
            .any(|p| *p < Decimal::ZERO)
        {
            return Err(CatalogError::InvalidFilter(
                "price bounds must not be negative".to_owned(),
            ));
        }
        if let (Some(min), Some(max)) = (min_price, max_price)
            && min > max
        {
            return Err(CatalogError::InvalidFilter(
                "minPrice must not exceed maxPrice".to_owned(),
            ));
        }

        Ok(ProductFilter {
            categories: self
                .categories
                .as_deref()
                .map(ProductFilter::split_list)
                .unwrap_or_default(),
            sizes: self
                .sizes
                .as_deref()
                .map(ProductFilter::split_list)
                .unwrap_or_default(),
            min_price,
            max_price,
            search: self
                .search
                .map(|s| s.trim().to_owned())
                .filter(|s| !s.is_empty()),
            limit: parse_param::<u32>("limit", self.limit.as_deref())?,
            offset: parse_param::<u32>("offset", self.offset.as_deref())?,
        })
    }
}

fn parse_param<T: FromStr>(name: &str, raw: Option<&str>) -> Result<Option<T>, CatalogError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| CatalogError::InvalidFilter(format!("invalid {name}: {value}"))),
    }
}

/// Catalog operations for one store.
pub struct CatalogService<'a> {
    store: &'a dyn Store,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Products matching `filter`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` on storage failure.
    #[instrument(skip(self))]
    pub async fn find_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, CatalogError> {
        Ok(self.store.find_products(filter).await?)
    }

    /// Look up a product by its textual id.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidIdentifier` if `raw` is not a UUID and
    /// `CatalogError::ProductNotFound` if no product has that id.
    #[instrument(skip(self))]
    pub async fn get_product(&self, raw: &str) -> Result<Product, CatalogError> {
        let id = ProductId::parse(raw).map_err(CatalogError::InvalidIdentifier)?;
        self.store
            .get_product(id)
            .await?
            .ok_or(CatalogError::ProductNotFound)
    }

    /// Validate and insert a batch of products.
    ///
    /// The batch is all-or-nothing: one invalid entry rejects every entry.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidProduct` naming the first invalid entry.
    #[instrument(skip_all, fields(count = products.len()))]
    pub async fn add_products(
        &self,
        products: Vec<NewProduct>,
    ) -> Result<Vec<Product>, CatalogError> {
        for (index, product) in products.iter().enumerate() {
            product
                .validate()
                .map_err(|source| CatalogError::InvalidProduct { index, source })?;
        }

        let now = Utc::now();
        let products = products
            .into_iter()
            .map(|p| p.into_product(ProductId::generate(), now))
            .collect();
        let created = self.store.insert_products(products).await?;

        tracing::info!(count = created.len(), "products added");
        Ok(created)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use shopfront_core::Price;

    use super::*;
    use crate::db::MemoryStore;

    fn new_product(title: &str, org: i64, category: &[&str]) -> NewProduct {
        NewProduct {
            title: title.to_string(),
            name: "Brand".to_string(),
            desc: String::new(),
            img: None,
            price: Price::new(Decimal::from(org), Decimal::from(org), Decimal::ZERO),
            sizes: vec!["M".to_string()],
            category: category.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn test_query_into_filter() {
        let query = ProductQuery {
            categories: Some("Men, Casual".to_string()),
            min_price: Some("10".to_string()),
            max_price: Some("99.50".to_string()),
            search: Some("  shirt ".to_string()),
            limit: Some("20".to_string()),
            ..ProductQuery::default()
        };
        let filter = query.into_filter().unwrap();
        assert_eq!(filter.categories, vec!["Men", "Casual"]);
        assert!(filter.sizes.is_empty());
        assert_eq!(filter.min_price, Some(Decimal::from(10)));
        assert_eq!(filter.max_price, Some(Decimal::new(9950, 2)));
        assert_eq!(filter.search.as_deref(), Some("shirt"));
        assert_eq!(filter.limit, Some(20));
        assert_eq!(filter.offset, None);
    }

    #[test]
    fn test_query_rejects_bad_numbers() {
        for query in [
            ProductQuery {
                min_price: Some("cheap".to_string()),
                ..ProductQuery::default()
            },
            ProductQuery {
                limit: Some("-1".to_string()),
                ..ProductQuery::default()
            },
            ProductQuery {
                max_price: Some("-5".to_string()),
                ..ProductQuery::default()
            },
            ProductQuery {
                min_price: Some("50".to_string()),
                max_price: Some("10".to_string()),
                ..ProductQuery::default()
            },
        ] {
            assert!(matches!(
                query.into_filter(),
                Err(CatalogError::InvalidFilter(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_add_then_find_products() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store);
        let created = catalog
            .add_products(vec![
                new_product("Shirt", 10, &["Men"]),
                new_product("Dress", 40, &["Women"]),
            ])
            .await
            .unwrap();
        assert_eq!(created.len(), 2);

        let filter = ProductFilter {
            categories: vec!["Women".to_string()],
            ..ProductFilter::default()
        };
        let found = catalog.find_products(&filter).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Dress");

        let fetched = catalog
            .get_product(&created[0].id.to_string())
            .await
            .unwrap();
        assert_eq!(fetched, created[0]);
    }

    #[tokio::test]
    async fn test_add_products_is_all_or_nothing() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store);
        let mut bad = new_product("Hat", 5, &[]);
        bad.name = String::new();

        let err = catalog
            .add_products(vec![new_product("Shirt", 10, &[]), bad])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CatalogError::InvalidProduct {
                index: 1,
                source: ProductError::Missing("name")
            }
        ));
        assert!(
            catalog
                .find_products(&ProductFilter::default())
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_get_product_errors() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store);
        assert!(matches!(
            catalog.get_product("not-a-uuid").await,
            Err(CatalogError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            catalog.get_product(&ProductId::generate().to_string()).await,
            Err(CatalogError::ProductNotFound)
        ));
    }
}
