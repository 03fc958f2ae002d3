//! Shopfront Core - Domain types and rules.
//!
//! This crate provides the types shared by every Shopfront component:
//! - `storefront` - JSON API server
//! - `cli` - Command-line tools for migrations and catalog seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no database
//! access, no HTTP. Storage backends load state, hand it to these rules, and
//! persist whatever the rules produced. Every backend therefore enforces the
//! same cart and checkout invariants.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, emails, prices, quantities, addresses
//! - [`product`] - Catalog products and the catalog filter predicate
//! - [`cart`] - The cart aggregate and its mutation rules
//! - [`order`] - Order pricing and immutable order records

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod order;
pub mod product;
pub mod types;

pub use cart::{Cart, CartError, CartLine, CartMutation, LineChange};
pub use order::{CheckoutError, Order, OrderLine, PricedCart};
pub use product::{NewProduct, Product, ProductError, ProductFilter};
pub use types::*;
