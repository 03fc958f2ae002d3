//! Catalog products and catalog filtering.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Price, PriceError, ProductId};

/// Errors from validating a [`NewProduct`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProductError {
    /// A required text field is blank.
    #[error("{0} is required")]
    Missing(&'static str),
    /// The price is invalid.
    #[error(transparent)]
    Price(#[from] PriceError),
}

/// A catalog product.
///
/// Products are read-only from the cart's point of view. Carts and favorites
/// hold a [`ProductId`] and resolve it against the catalog at read time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub name: String,
    pub desc: String,
    pub img: Option<String>,
    pub price: Price,
    pub sizes: Vec<String>,
    pub category: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub title: String,
    pub name: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub img: Option<String>,
    pub price: Price,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub category: Vec<String>,
}

impl NewProduct {
    /// Validate the input.
    ///
    /// # Errors
    ///
    /// Returns `ProductError` if the title or name is blank or the price is
    /// invalid.
    pub fn validate(&self) -> Result<(), ProductError> {
        if self.title.trim().is_empty() {
            return Err(ProductError::Missing("title"));
        }
        if self.name.trim().is_empty() {
            return Err(ProductError::Missing("name"));
        }
        self.price.validate()?;
        Ok(())
    }

    /// Build the stored product, trimming text and de-duplicating tags.
    #[must_use]
    pub fn into_product(self, id: ProductId, now: DateTime<Utc>) -> Product {
        Product {
            id,
            title: self.title.trim().to_owned(),
            name: self.name.trim().to_owned(),
            desc: self.desc.trim().to_owned(),
            img: self.img.filter(|s| !s.trim().is_empty()),
            price: self.price,
            sizes: dedup_tags(self.sizes),
            category: dedup_tags(self.category),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Trim tags, drop empties and repeats, keep first-seen order.
fn dedup_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_owned());
        }
    }
    out
}

// =============================================================================
// Filtering
// =============================================================================

/// Catalog query.
///
/// Every populated criterion must hold (logical AND). Within `categories` and
/// `sizes` any one match suffices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    /// Product must carry at least one of these category tags.
    pub categories: Vec<String>,
    /// Product must offer at least one of these sizes.
    pub sizes: Vec<String>,
    /// Inclusive lower bound on `price.org`.
    pub min_price: Option<Decimal>,
    /// Inclusive upper bound on `price.org`.
    pub max_price: Option<Decimal>,
    /// Case-insensitive literal substring of the title or description.
    pub search: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ProductFilter {
    /// Upper bound on a single page of results.
    pub const MAX_LIMIT: u32 = 100;

    /// Split a comma-separated query value into trimmed, non-empty items.
    #[must_use]
    pub fn split_list(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect()
    }

    /// The page size to apply, capped at [`Self::MAX_LIMIT`].
    #[must_use]
    pub fn effective_limit(&self) -> Option<u32> {
        self.limit.map(|l| l.min(Self::MAX_LIMIT))
    }

    /// Whether `product` satisfies every criterion except pagination.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        if !self.categories.is_empty()
            && !product.category.iter().any(|c| self.categories.contains(c))
        {
            return false;
        }
        if !self.sizes.is_empty() && !product.sizes.iter().any(|s| self.sizes.contains(s)) {
            return false;
        }
        if self.min_price.is_some_and(|min| product.price.org < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| product.price.org > max) {
            return false;
        }
        if let Some(needle) = self.search.as_deref().map(str::to_lowercase) {
            let hit = product.title.to_lowercase().contains(&needle)
                || product.desc.to_lowercase().contains(&needle);
            if !hit {
                return false;
            }
        }
        true
    }
}
