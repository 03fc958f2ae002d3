//! Cart and favorite entries joined with current catalog data.

use serde::Serialize;

use shopfront_core::{CartLine, Product, ProductId, Quantity};

/// A cart line with its product resolved at read time.
///
/// `product` is `None` and `stale` is `true` when the product has been
/// removed from the catalog since it was added.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartEntry {
    pub product_id: ProductId,
    pub quantity: Quantity,
    pub product: Option<Product>,
    pub stale: bool,
}

/// A favorite with its product resolved at read time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteEntry {
    pub product_id: ProductId,
    pub product: Option<Product>,
    pub stale: bool,
}

fn find(products: &[Product], id: ProductId) -> Option<Product> {
    products.iter().find(|p| p.id == id).cloned()
}

impl CartEntry {
    /// Join `lines` with `products`, marking lines whose product is gone.
    #[must_use]
    pub fn resolve(lines: &[CartLine], products: &[Product]) -> Vec<Self> {
        lines
            .iter()
            .map(|line| {
                let product = find(products, line.product_id);
                Self {
                    product_id: line.product_id,
                    quantity: line.quantity,
                    stale: product.is_none(),
                    product,
                }
            })
            .collect()
    }
}

impl FavoriteEntry {
    /// Join favorite ids with `products`, marking ids whose product is gone.
    #[must_use]
    pub fn resolve(ids: &[ProductId], products: &[Product]) -> Vec<Self> {
        ids.iter()
            .map(|&id| {
                let product = find(products, id);
                Self {
                    product_id: id,
                    stale: product.is_none(),
                    product,
                }
            })
            .collect()
    }
}
