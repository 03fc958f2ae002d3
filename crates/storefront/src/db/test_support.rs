//! Fixtures for the Postgres repository tests.

#![allow(clippy::unwrap_used)]

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;

use shopfront_core::{DeliveryAddress, Email, NewProduct, Price, Product, ProductId, UserId};

use super::products::ProductRepository;
use super::users::UserRepository;
use crate::models::user::NewUser;

pub async fn pool() -> PgPool {
    let url = std::env::var("STOREFRONT_DATABASE_URL").unwrap();
    let pool = PgPool::connect(&url).await.unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

/// A fresh account with a unique email.
pub async fn user(pool: &PgPool) -> UserId {
    let new = NewUser {
        name: "Ada".to_string(),
        email: Email::parse(&format!("{}@example.com", UserId::generate())).unwrap(),
        password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
        img: None,
    };
    UserRepository::new(pool).create(&new).await.unwrap().id
}

/// A catalog product selling for `cents / 100`.
pub async fn product(pool: &PgPool, cents: i64) -> Product {
    let product = NewProduct {
        title: "Linen Shirt".to_string(),
        name: "linen-shirt".to_string(),
        desc: String::new(),
        img: None,
        price: Price::new(Decimal::new(cents, 2), Decimal::new(cents, 2), Decimal::ZERO),
        sizes: vec!["M".to_string()],
        category: vec!["shirts".to_string()],
    }
    .into_product(ProductId::generate(), Utc::now());

    ProductRepository::new(pool)
        .insert_all(vec![product])
        .await
        .unwrap()
        .pop()
        .unwrap()
}

pub fn address() -> DeliveryAddress {
    DeliveryAddress {
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        complete_address: "12 St James's Square, London".to_string(),
        phone_number: "+44 20 7946 0000".to_string(),
        email_address: "ada@example.com".to_string(),
    }
}

pub async fn cart_item_count(pool: &PgPool, user: UserId) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM cart_items WHERE user_id = $1")
        .bind(user)
        .fetch_one(pool)
        .await
        .unwrap()
}
