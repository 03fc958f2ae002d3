//! User domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use shopfront_core::{Cart, CartLine, Email, OrderId, ProductId, UserId};

/// A storefront user (domain type).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Login email, unique and normalized.
    pub email: Email,
    /// Optional avatar image reference.
    pub img: Option<String>,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: Email,
    pub password_hash: String,
    pub img: Option<String>,
}

/// A user together with everything it owns.
///
/// This is the consistency boundary for cart and favorite mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAggregate {
    pub user: User,
    pub cart: Cart,
    /// Favorited products in the order they were added.
    pub favorites: Vec<ProductId>,
    /// Order ids, oldest first.
    pub orders: Vec<OrderId>,
}

/// JSON representation of a user returned by the API.
///
/// Never carries the password hash.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub img: Option<String>,
    pub cart: Vec<CartLine>,
    pub favorites: Vec<ProductId>,
    pub orders: Vec<OrderId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserAggregate> for UserView {
    fn from(aggregate: UserAggregate) -> Self {
        let UserAggregate {
            user,
            cart,
            favorites,
            orders,
        } = aggregate;
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            img: user.img,
            cart: cart.lines().to_vec(),
            favorites,
            orders,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use shopfront_core::Quantity;

    #[test]
    fn test_user_view_shape() {
        let now = Utc::now();
        let product = ProductId::generate();
        let mut cart = Cart::new();
        cart.add(product, Quantity::new(2).unwrap()).unwrap();
        let aggregate = UserAggregate {
            user: User {
                id: UserId::generate(),
                name: "Ada".to_string(),
                email: Email::parse("ada@example.com").unwrap(),
                img: None,
                created_at: now,
                updated_at: now,
            },
            cart,
            favorites: vec![product],
            orders: vec![],
        };

        let json = serde_json::to_value(UserView::from(aggregate)).unwrap();
        assert_eq!(json["email"], "ada@example.com");
        assert_eq!(json["cart"][0]["quantity"], 2);
        assert_eq!(json["favorites"][0], product.to_string());
        assert!(json.get("createdAt").is_some());
        assert!(json.get("passwordHash").is_none());
    }
}
