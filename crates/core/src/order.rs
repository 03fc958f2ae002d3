//! Order pricing and immutable order records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cart::Cart;
use crate::product::Product;
use crate::types::{AddressError, DeliveryAddress, OrderId, ProductId, Quantity, UserId};

/// Reasons a cart cannot be turned into an order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,
    /// A cart line points at a product that no longer exists.
    #[error("product {0} is no longer available")]
    StaleProduct(ProductId),
    #[error("incomplete address: {0}")]
    IncompleteAddress(#[from] AddressError),
    #[error("order total is too large")]
    TotalOverflow,
}

/// One line of a placed order, with the price captured at placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: ProductId,
    pub title: String,
    pub quantity: Quantity,
    pub unit_price: Decimal,
}

impl OrderLine {
    /// `quantity * unit_price`, or `None` on overflow.
    #[must_use]
    pub fn line_total(&self) -> Option<Decimal> {
        self.unit_price
            .checked_mul(Decimal::from(self.quantity.get()))
    }
}

/// Exclusive upper bound for an order total (twelve integer digits).
pub const MAX_ORDER_TOTAL: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

/// A cart resolved against current catalog prices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedCart {
    pub lines: Vec<OrderLine>,
    pub total: Decimal,
}

impl PricedCart {
    /// Price every line of `cart` using `products`.
    ///
    /// Totals are computed from `price.org` of each product as it is now;
    /// nothing the client sent is trusted.
    ///
    /// # Errors
    ///
    /// - `CheckoutError::EmptyCart` if the cart has no lines
    /// - `CheckoutError::StaleProduct` if a line's product is not in `products`
    /// - `CheckoutError::TotalOverflow` if the total reaches [`MAX_ORDER_TOTAL`]
    pub fn price(cart: &Cart, products: &[Product]) -> Result<Self, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let mut lines = Vec::with_capacity(cart.len());
        let mut total = Decimal::ZERO;
        for line in cart.lines() {
            let product = products
                .iter()
                .find(|p| p.id == line.product_id)
                .ok_or(CheckoutError::StaleProduct(line.product_id))?;
            let priced = OrderLine {
                product_id: product.id,
                title: product.title.clone(),
                quantity: line.quantity,
                unit_price: product.price.org,
            };
            total = priced
                .line_total()
                .and_then(|t| total.checked_add(t))
                .filter(|t| *t < MAX_ORDER_TOTAL)
                .ok_or(CheckoutError::TotalOverflow)?;
            lines.push(priced);
        }

        Ok(Self { lines, total })
    }
}

/// A placed order. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub products: Vec<OrderLine>,
    pub total_amount: Decimal,
    /// Single-line form of `delivery_address`.
    pub address: String,
    pub delivery_address: DeliveryAddress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Build an order from a priced cart.
    ///
    /// The address is trimmed and validated here so that every backend
    /// stores the same normalized form.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::IncompleteAddress` if any address field is blank.
    pub fn new(
        id: OrderId,
        user_id: UserId,
        address: &DeliveryAddress,
        priced: PricedCart,
        idempotency_key: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, CheckoutError> {
        address.validate()?;
        let delivery_address = address.trimmed();
        Ok(Self {
            id,
            user_id,
            products: priced.lines,
            total_amount: priced.total,
            address: delivery_address.to_composite(),
            delivery_address,
            idempotency_key,
            created_at: now,
        })
    }
}
