//! The cart aggregate and its mutation rules.
//!
//! A [`Cart`] is an ordered list of [`CartLine`]s with at most one line per
//! product. Storage backends load it, call [`Cart::apply`] with a
//! [`CartMutation`], and persist the resulting [`LineChange`]. Keeping the
//! rules here means the in-memory and Postgres backends cannot drift apart.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{ProductId, Quantity};

/// Errors from applying a [`CartMutation`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// Removal was requested for a product the cart does not contain.
    #[error("product {0} is not in the cart")]
    ProductNotInCart(ProductId),
    /// Adding would push the line past the maximum quantity.
    #[error("quantity for product {0} would exceed the maximum")]
    QuantityOverflow(ProductId),
}

/// One product and how many units of it the user wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: Quantity,
}

/// A requested change to a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartMutation {
    /// Add units, creating the line if needed.
    Add {
        product: ProductId,
        quantity: Quantity,
    },
    /// Remove some units. Reaching zero or below removes the line.
    Decrement {
        product: ProductId,
        quantity: Quantity,
    },
    /// Remove the line whatever its quantity.
    Delete { product: ProductId },
}

impl CartMutation {
    /// The product this mutation targets.
    #[must_use]
    pub const fn product(&self) -> ProductId {
        match *self {
            Self::Add { product, .. }
            | Self::Decrement { product, .. }
            | Self::Delete { product } => product,
        }
    }
}

/// What a mutation did to the stored lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineChange {
    /// The line now holds this quantity (inserted or updated).
    Upserted(CartLine),
    /// The line for this product no longer exists.
    Removed(ProductId),
}

/// A user's cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Rebuild a cart from stored lines, merging any duplicate products.
    ///
    /// # Errors
    ///
    /// Returns `CartError::QuantityOverflow` if merging duplicates would
    /// exceed [`Quantity::MAX`].
    pub fn from_lines(lines: impl IntoIterator<Item = CartLine>) -> Result<Self, CartError> {
        let mut cart = Self::new();
        for line in lines {
            cart.add(line.product_id, line.quantity)?;
        }
        Ok(cart)
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Current quantity of `product`, if it has a line.
    #[must_use]
    pub fn quantity_of(&self, product: ProductId) -> Option<Quantity> {
        self.lines
            .iter()
            .find(|l| l.product_id == product)
            .map(|l| l.quantity)
    }

    fn position(&self, product: ProductId) -> Option<usize> {
        self.lines.iter().position(|l| l.product_id == product)
    }

    /// Add `quantity` units of `product`.
    ///
    /// An existing line is incremented in place. A new line is appended.
    ///
    /// # Errors
    ///
    /// Returns `CartError::QuantityOverflow` if the line would exceed
    /// [`Quantity::MAX`]. The cart is unchanged on error.
    pub fn add(&mut self, product: ProductId, quantity: Quantity) -> Result<LineChange, CartError> {
        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product) {
            line.quantity = line
                .quantity
                .checked_add(quantity)
                .ok_or(CartError::QuantityOverflow(product))?;
            return Ok(LineChange::Upserted(*line));
        }
        let line = CartLine {
            product_id: product,
            quantity,
        };
        self.lines.push(line);
        Ok(LineChange::Upserted(line))
    }

    /// Remove `quantity` units of `product`, dropping the line if none remain.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ProductNotInCart` if there is no line for `product`.
    pub fn decrement(
        &mut self,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<LineChange, CartError> {
        let idx = self
            .position(product)
            .ok_or(CartError::ProductNotInCart(product))?;
        let remaining = self
            .lines
            .get(idx)
            .and_then(|l| l.quantity.checked_sub(quantity));
        match remaining {
            Some(q) => {
                let line = CartLine {
                    product_id: product,
                    quantity: q,
                };
                if let Some(slot) = self.lines.get_mut(idx) {
                    *slot = line;
                }
                Ok(LineChange::Upserted(line))
            }
            None => {
                self.lines.remove(idx);
                Ok(LineChange::Removed(product))
            }
        }
    }

    /// Remove the line for `product` entirely.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ProductNotInCart` if there is no line for `product`.
    pub fn remove(&mut self, product: ProductId) -> Result<LineChange, CartError> {
        let idx = self
            .position(product)
            .ok_or(CartError::ProductNotInCart(product))?;
        self.lines.remove(idx);
        Ok(LineChange::Removed(product))
    }

    /// Apply a mutation.
    ///
    /// # Errors
    ///
    /// See [`Self::add`], [`Self::decrement`] and [`Self::remove`].
    pub fn apply(&mut self, mutation: CartMutation) -> Result<LineChange, CartError> {
        match mutation {
            CartMutation::Add { product, quantity } => self.add(product, quantity),
            CartMutation::Decrement { product, quantity } => self.decrement(product, quantity),
            CartMutation::Delete { product } => self.remove(product),
        }
    }

    /// Empty the cart, returning the lines it held.
    pub fn clear(&mut self) -> Vec<CartLine> {
        std::mem::take(&mut self.lines)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn qty(n: i64) -> Quantity {
        Quantity::new(n).unwrap()
    }

    #[test]
    fn test_add_accumulates() {
        let p = ProductId::generate();
        let mut cart = Cart::new();
        cart.add(p, qty(2)).unwrap();
        cart.add(p, qty(3)).unwrap();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.quantity_of(p), Some(qty(5)));
    }

    #[test]
    fn test_add_keeps_insertion_order() {
        let (a, b, c) = (
            ProductId::generate(),
            ProductId::generate(),
            ProductId::generate(),
        );
        let mut cart = Cart::new();
        cart.add(a, qty(1)).unwrap();
        cart.add(b, qty(1)).unwrap();
        cart.add(c, qty(1)).unwrap();
        cart.add(a, qty(1)).unwrap();
        let order: Vec<_> = cart.lines().iter().map(|l| l.product_id).collect();
        assert_eq!(order, vec![a, b, c]);
    }

    #[test]
    fn test_add_overflow_leaves_cart_unchanged() {
        let p = ProductId::generate();
        let mut cart = Cart::new();
        cart.add(p, qty(i64::from(Quantity::MAX))).unwrap();
        assert_eq!(
            cart.add(p, qty(1)),
            Err(CartError::QuantityOverflow(p))
        );
        assert_eq!(cart.quantity_of(p), Some(qty(i64::from(Quantity::MAX))));
    }

    #[test]
    fn test_decrement_partial() {
        let p = ProductId::generate();
        let mut cart = Cart::new();
        cart.add(p, qty(5)).unwrap();
        let change = cart.decrement(p, qty(2)).unwrap();
        assert_eq!(
            change,
            LineChange::Upserted(CartLine {
                product_id: p,
                quantity: qty(3)
            })
        );
    }

    #[test]
    fn test_decrement_at_or_past_current_removes_line() {
        let p = ProductId::generate();
        let mut cart = Cart::new();
        cart.add(p, qty(2)).unwrap();
        assert_eq!(cart.decrement(p, qty(2)).unwrap(), LineChange::Removed(p));
        assert!(cart.is_empty());

        cart.add(p, qty(2)).unwrap();
        assert_eq!(cart.decrement(p, qty(7)).unwrap(), LineChange::Removed(p));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove_ignores_quantity() {
        let p = ProductId::generate();
        let mut cart = Cart::new();
        cart.add(p, qty(9)).unwrap();
        assert_eq!(cart.remove(p).unwrap(), LineChange::Removed(p));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_removal_of_missing_product_fails() {
        let p = ProductId::generate();
        let mut cart = Cart::new();
        assert_eq!(cart.remove(p), Err(CartError::ProductNotInCart(p)));
        assert_eq!(
            cart.decrement(p, qty(1)),
            Err(CartError::ProductNotInCart(p))
        );
    }

    #[test]
    fn test_example_sequence() {
        let p = ProductId::generate();
        let mut cart = Cart::new();
        cart.apply(CartMutation::Add {
            product: p,
            quantity: qty(2),
        })
        .unwrap();
        assert_eq!(cart.quantity_of(p), Some(qty(2)));
        cart.apply(CartMutation::Add {
            product: p,
            quantity: qty(1),
        })
        .unwrap();
        assert_eq!(cart.quantity_of(p), Some(qty(3)));
        cart.apply(CartMutation::Decrement {
            product: p,
            quantity: qty(1),
        })
        .unwrap();
        assert_eq!(cart.quantity_of(p), Some(qty(2)));
        cart.apply(CartMutation::Delete { product: p }).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_from_lines_merges_duplicates() {
        let p = ProductId::generate();
        let cart = Cart::from_lines([
            CartLine {
                product_id: p,
                quantity: qty(1),
            },
            CartLine {
                product_id: p,
                quantity: qty(2),
            },
        ])
        .unwrap();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.quantity_of(p), Some(qty(3)));
    }

    #[test]
    fn test_from_lines_reports_merge_overflow() {
        let p = ProductId::generate();
        let max = Quantity::new(i64::from(Quantity::MAX)).unwrap();
        let err = Cart::from_lines([
            CartLine {
                product_id: p,
                quantity: max,
            },
            CartLine {
                product_id: p,
                quantity: qty(1),
            },
        ])
        .unwrap_err();
        assert_eq!(err, CartError::QuantityOverflow(p));
    }

    #[test]
    fn test_clear_returns_lines() {
        let mut cart = Cart::new();
        cart.add(ProductId::generate(), qty(1)).unwrap();
        assert_eq!(cart.clear().len(), 1);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_serializes_as_line_array() {
        let p = ProductId::parse("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        let mut cart = Cart::new();
        cart.add(p, qty(2)).unwrap();
        assert_eq!(
            serde_json::to_value(&cart).unwrap(),
            serde_json::json!([{
                "productId": "67e55044-10b1-426f-9247-bb680e5fe0c8",
                "quantity": 2
            }])
        );
    }
}
