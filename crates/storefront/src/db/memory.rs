//! In-memory store.
//!
//! Each user aggregate sits behind its own `tokio::sync::Mutex`, so writes to
//! one user are serialized while different users proceed in parallel. The
//! email index is only written while creating a user, under its write lock,
//! which makes the uniqueness check and the insert a single step.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};

use shopfront_core::{
    Cart, CartMutation, Email, Order, OrderId, PricedCart, Product, ProductFilter, ProductId,
    UserId,
};

use super::{
    CartStore, CartWriteError, CatalogStore, OrderRequest, OrderStore, OrderWriteError,
    PlacedOrder, RepositoryError, Store, UserStore,
};
use crate::models::user::{NewUser, User, UserAggregate};

struct UserRecord {
    user: User,
    password_hash: String,
    cart: Cart,
    favorites: Vec<ProductId>,
    orders: Vec<Order>,
}

impl UserRecord {
    fn aggregate(&self) -> UserAggregate {
        UserAggregate {
            user: self.user.clone(),
            cart: self.cart.clone(),
            favorites: self.favorites.clone(),
            orders: self.orders.iter().map(|o| o.id).collect(),
        }
    }

    fn touch(&mut self) {
        self.user.updated_at = Utc::now();
    }
}

/// Store that keeps everything in process memory.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<UserId, Arc<Mutex<UserRecord>>>>,
    emails: RwLock<HashMap<Email, UserId>>,
    products: RwLock<Vec<Product>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn record(&self, id: UserId) -> Option<Arc<Mutex<UserRecord>>> {
        self.users.read().await.get(&id).cloned()
    }

    async fn products_among(&self, ids: &[ProductId]) -> Vec<Product> {
        self.products
            .read()
            .await
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect()
    }

    /// Remove a product from the catalog. Carts and favorites keep their
    /// references, which then read back as stale.
    pub async fn remove_product(&self, id: ProductId) -> bool {
        let mut products = self.products.write().await;
        let before = products.len();
        products.retain(|p| p.id != id);
        products.len() != before
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, new: NewUser) -> Result<User, RepositoryError> {
        let mut emails = self.emails.write().await;
        if emails.contains_key(&new.email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let now = Utc::now();
        let user = User {
            id: UserId::generate(),
            name: new.name,
            email: new.email,
            img: new.img,
            created_at: now,
            updated_at: now,
        };
        let record = UserRecord {
            user: user.clone(),
            password_hash: new.password_hash,
            cart: Cart::new(),
            favorites: Vec::new(),
            orders: Vec::new(),
        };

        self.users
            .write()
            .await
            .insert(user.id, Arc::new(Mutex::new(record)));
        emails.insert(user.email.clone(), user.id);
        drop(emails);

        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let Some(record) = self.record(id).await else {
            return Ok(None);
        };
        let user = record.lock().await.user.clone();
        Ok(Some(user))
    }

    async fn get_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let id = self.emails.read().await.get(email).copied();
        let Some(record) = (match id {
            Some(id) => self.record(id).await,
            None => None,
        }) else {
            return Ok(None);
        };
        let record = record.lock().await;
        Ok(Some((record.user.clone(), record.password_hash.clone())))
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self
            .products
            .read()
            .await
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        Ok(self.products_among(ids).await)
    }

    async fn find_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let products = self.products.read().await;
        let offset = filter.offset.map_or(0, |o| o as usize);
        let limit = filter.effective_limit().map_or(usize::MAX, |l| l as usize);
        Ok(products
            .iter()
            .filter(|p| filter.matches(p))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn insert_products(
        &self,
        new: Vec<Product>,
    ) -> Result<Vec<Product>, RepositoryError> {
        let mut products = self.products.write().await;
        if new.iter().any(|n| products.iter().any(|p| p.id == n.id)) {
            return Err(RepositoryError::Conflict("product already exists".to_owned()));
        }
        products.extend(new.iter().cloned());
        drop(products);
        Ok(new)
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn load_aggregate(
        &self,
        user: UserId,
    ) -> Result<Option<UserAggregate>, RepositoryError> {
        let Some(record) = self.record(user).await else {
            return Ok(None);
        };
        let aggregate = record.lock().await.aggregate();
        Ok(Some(aggregate))
    }

    async fn apply_cart(
        &self,
        user: UserId,
        mutation: CartMutation,
    ) -> Result<UserAggregate, CartWriteError> {
        let record = self
            .record(user)
            .await
            .ok_or(CartWriteError::UserNotFound)?;
        let mut record = record.lock().await;

        // Apply to a copy so a rejected mutation leaves the cart untouched.
        let mut cart = record.cart.clone();
        cart.apply(mutation)?;
        record.cart = cart;
        record.touch();

        Ok(record.aggregate())
    }

    async fn set_favorite(
        &self,
        user: UserId,
        product: ProductId,
        favorite: bool,
    ) -> Result<UserAggregate, CartWriteError> {
        let record = self
            .record(user)
            .await
            .ok_or(CartWriteError::UserNotFound)?;
        let mut record = record.lock().await;

        let present = record.favorites.contains(&product);
        if favorite && !present {
            record.favorites.push(product);
            record.touch();
        } else if !favorite && present {
            record.favorites.retain(|p| *p != product);
            record.touch();
        }

        Ok(record.aggregate())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn place_order(
        &self,
        user: UserId,
        request: OrderRequest,
    ) -> Result<PlacedOrder, OrderWriteError> {
        let record = self
            .record(user)
            .await
            .ok_or(OrderWriteError::UserNotFound)?;
        let mut record = record.lock().await;

        if let Some(key) = request.idempotency_key.as_deref()
            && let Some(existing) = record
                .orders
                .iter()
                .find(|o| o.idempotency_key.as_deref() == Some(key))
        {
            return Ok(PlacedOrder {
                order: existing.clone(),
                replayed: true,
            });
        }

        request
            .address
            .validate()
            .map_err(shopfront_core::CheckoutError::from)?;

        let ids: Vec<ProductId> = record.cart.lines().iter().map(|l| l.product_id).collect();
        let products = self.products_among(&ids).await;
        let priced = PricedCart::price(&record.cart, &products)?;
        let order = Order::new(
            OrderId::generate(),
            user,
            &request.address,
            priced,
            request.idempotency_key,
            Utc::now(),
        )?;

        record.orders.push(order.clone());
        record.cart.clear();
        record.touch();

        Ok(PlacedOrder {
            order,
            replayed: false,
        })
    }

    async fn list_orders(&self, user: UserId) -> Result<Vec<Order>, RepositoryError> {
        let Some(record) = self.record(user).await else {
            return Ok(Vec::new());
        };
        let record = record.lock().await;
        Ok(record.orders.iter().rev().cloned().collect())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shopfront_core::{DeliveryAddress, NewProduct, Price, Quantity};

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Ada".to_string(),
            email: Email::parse(email).unwrap(),
            password_hash: "hash".to_string(),
            img: None,
        }
    }

    fn product(org: i64) -> Product {
        NewProduct {
            title: "Shirt".to_string(),
            name: "Brand".to_string(),
            desc: String::new(),
            img: None,
            price: Price::new(Decimal::from(org), Decimal::from(org), Decimal::ZERO),
            sizes: vec![],
            category: vec![],
        }
        .into_product(ProductId::generate(), Utc::now())
    }

    fn address() -> DeliveryAddress {
        DeliveryAddress {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            complete_address: "1 Road".to_string(),
            phone_number: "555".to_string(),
            email_address: "ada@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        store.create_user(new_user("a@example.com")).await.unwrap();
        let err = store
            .create_user(new_user("A@Example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_rejected_mutation_leaves_cart_unchanged() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("a@example.com")).await.unwrap();
        let p = ProductId::generate();

        let err = store
            .apply_cart(user.id, CartMutation::Delete { product: p })
            .await
            .unwrap_err();
        assert!(matches!(err, CartWriteError::Rule(_)));
        let aggregate = store.load_aggregate(user.id).await.unwrap().unwrap();
        assert!(aggregate.cart.is_empty());
    }

    #[tokio::test]
    async fn test_order_replay_with_same_key() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("a@example.com")).await.unwrap();
        let shirt = product(10);
        store.insert_products(vec![shirt.clone()]).await.unwrap();
        store
            .apply_cart(
                user.id,
                CartMutation::Add {
                    product: shirt.id,
                    quantity: Quantity::ONE,
                },
            )
            .await
            .unwrap();

        let request = OrderRequest {
            address: address(),
            idempotency_key: Some("k-1".to_string()),
        };
        let first = store.place_order(user.id, request.clone()).await.unwrap();
        let second = store.place_order(user.id, request).await.unwrap();

        assert!(!first.replayed);
        assert!(second.replayed);
        assert_eq!(first.order.id, second.order.id);
        assert_eq!(store.list_orders(user.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_find_products_paginates() {
        let store = MemoryStore::new();
        let products: Vec<_> = (1..=5).map(product).collect();
        store.insert_products(products.clone()).await.unwrap();

        let filter = ProductFilter {
            limit: Some(2),
            offset: Some(1),
            ..ProductFilter::default()
        };
        let page = store.find_products(&filter).await.unwrap();
        let ids: Vec<_> = page.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![products[1].id, products[2].id]);
    }

    #[tokio::test]
    async fn test_removed_product_is_gone_from_catalog() {
        let store = MemoryStore::new();
        let shirt = product(10);
        store.insert_products(vec![shirt.clone()]).await.unwrap();
        assert!(store.remove_product(shirt.id).await);
        assert!(store.get_product(shirt.id).await.unwrap().is_none());
        assert!(!store.remove_product(shirt.id).await);
    }
}
