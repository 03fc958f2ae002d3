//! Domain models for storefront.
//!
//! - [`user`] - Users, the user aggregate, and its JSON view
//! - [`cart`] - Cart and favorite entries resolved against the catalog

pub mod cart;
pub mod user;
