//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Signup, signin and identity tokens
//! - `cart` - Cart lines and favorites
//! - `orders` - Checkout and order history
//! - `catalog` - Product queries and product creation
//!
//! Services borrow the store for the duration of one request and hold no
//! state of their own.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod orders;
