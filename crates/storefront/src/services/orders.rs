//! Order placement and history.

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::instrument;

use shopfront_core::{AddressError, CheckoutError, DeliveryAddress, Order, ProductId, UserId};

use crate::db::{OrderRequest, OrderWriteError, PlacedOrder, RepositoryError, Store};

/// Longest accepted idempotency key.
pub const MAX_IDEMPOTENCY_KEY_LENGTH: usize = 255;

/// Errors from order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("user not found")]
    UserNotFound,
    #[error("incomplete address: {0}")]
    IncompleteAddress(#[from] AddressError),
    #[error("cart is empty")]
    EmptyCart,
    #[error("product {0} in the cart is no longer available")]
    StaleProduct(ProductId),
    #[error("order total is too large")]
    TotalOverflow,
    #[error("invalid idempotency key")]
    InvalidIdempotencyKey,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<OrderWriteError> for OrderError {
    fn from(e: OrderWriteError) -> Self {
        match e {
            OrderWriteError::UserNotFound => Self::UserNotFound,
            OrderWriteError::Checkout(c) => match c {
                CheckoutError::EmptyCart => Self::EmptyCart,
                CheckoutError::StaleProduct(p) => Self::StaleProduct(p),
                CheckoutError::IncompleteAddress(a) => Self::IncompleteAddress(a),
                CheckoutError::TotalOverflow => Self::TotalOverflow,
            },
            OrderWriteError::Repository(e) => Self::Repository(e),
        }
    }
}

/// Order operations for one store.
pub struct OrderService<'a> {
    store: &'a dyn Store,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Convert the user's cart into an order and empty the cart.
    ///
    /// The total is computed from current catalog prices. `client_total` is
    /// only compared against it for logging.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::IncompleteAddress` for a blank address field,
    /// `EmptyCart` for an empty cart, and `StaleProduct` if a cart line refers
    /// to a removed product. Nothing is changed on error.
    #[instrument(skip_all, fields(%user, idempotency_key = idempotency_key.as_deref()))]
    pub async fn place_order(
        &self,
        user: UserId,
        address: DeliveryAddress,
        idempotency_key: Option<String>,
        client_total: Option<Decimal>,
    ) -> Result<PlacedOrder, OrderError> {
        address.validate()?;
        let idempotency_key = idempotency_key
            .map(|k| k.trim().to_owned())
            .filter(|k| !k.is_empty());
        if idempotency_key
            .as_ref()
            .is_some_and(|k| k.len() > MAX_IDEMPOTENCY_KEY_LENGTH)
        {
            return Err(OrderError::InvalidIdempotencyKey);
        }

        let placed = self
            .store
            .place_order(
                user,
                OrderRequest {
                    address,
                    idempotency_key,
                },
            )
            .await?;

        if placed.replayed {
            tracing::info!(order_id = %placed.order.id, "returning existing order for idempotency key");
        } else {
            tracing::info!(
                order_id = %placed.order.id,
                total = %placed.order.total_amount,
                lines = placed.order.products.len(),
                "order placed"
            );
            if let Some(claimed) = client_total
                && claimed != placed.order.total_amount
            {
                tracing::warn!(
                    order_id = %placed.order.id,
                    %claimed,
                    computed = %placed.order.total_amount,
                    "client total differs from computed total"
                );
            }
        }

        Ok(placed)
    }

    /// The user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::UserNotFound` if the user has been deleted.
    pub async fn list_orders(&self, user: UserId) -> Result<Vec<Order>, OrderError> {
        if self.store.get_user(user).await?.is_none() {
            return Err(OrderError::UserNotFound);
        }
        Ok(self.store.list_orders(user).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use shopfront_core::{NewProduct, Price, Product, Quantity};

    use super::*;
    use crate::db::{CartStore, CatalogStore, MemoryStore, UserStore};
    use crate::models::user::NewUser;
    use crate::services::cart::CartService;

    fn product(org: Decimal) -> Product {
        NewProduct {
            title: "Shirt".to_string(),
            name: "Brand".to_string(),
            desc: String::new(),
            img: None,
            price: Price::new(org, org, Decimal::ZERO),
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

    async fn setup() -> (MemoryStore, UserId, Product, Product) {
        let store = MemoryStore::new();
        let user = store
            .create_user(NewUser {
                name: "Ada".to_string(),
                email: shopfront_core::Email::parse("ada@example.com").unwrap(),
                password_hash: "hash".to_string(),
                img: None,
            })
            .await
            .unwrap();
        let shirt = product(Decimal::new(1999, 2));
        let hat = product(Decimal::from(5));
        store
            .insert_products(vec![shirt.clone(), hat.clone()])
            .await
            .unwrap();
        (store, user.id, shirt, hat)
    }

    #[tokio::test]
    async fn test_place_order_prices_and_clears_cart() {
        let (store, user, shirt, hat) = setup().await;
        let carts = CartService::new(&store);
        carts.add_to_cart(user, shirt.id, 2).await.unwrap();
        carts.add_to_cart(user, hat.id, 1).await.unwrap();

        let placed = OrderService::new(&store)
            .place_order(user, address(), None, Some(Decimal::ONE))
            .await
            .unwrap();

        let order = placed.order;
        assert_eq!(order.total_amount, Decimal::new(4498, 2));
        let sum: Decimal = order.products.iter().map(|l| l.line_total().unwrap()).sum();
        assert_eq!(sum, order.total_amount);
        assert_eq!(order.products[0].unit_price, shirt.price.org);
        assert_eq!(order.products[0].quantity, Quantity::new(2).unwrap());

        let aggregate = store.load_aggregate(user).await.unwrap().unwrap();
        assert!(aggregate.cart.is_empty());
        assert_eq!(aggregate.orders, vec![order.id]);
    }

    #[tokio::test]
    async fn test_incomplete_address_changes_nothing() {
        let (store, user, shirt, _) = setup().await;
        CartService::new(&store)
            .add_to_cart(user, shirt.id, 1)
            .await
            .unwrap();

        let mut addr = address();
        addr.complete_address = String::new();
        let err = OrderService::new(&store)
            .place_order(user, addr, None, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrderError::IncompleteAddress(AddressError::Missing("completeAddress"))
        ));

        let aggregate = store.load_aggregate(user).await.unwrap().unwrap();
        assert_eq!(aggregate.cart.len(), 1);
        assert!(aggregate.orders.is_empty());
    }

    #[tokio::test]
    async fn test_empty_cart_rejected() {
        let (store, user, _, _) = setup().await;
        let err = OrderService::new(&store)
            .place_order(user, address(), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::EmptyCart));
    }

    #[tokio::test]
    async fn test_stale_product_blocks_order() {
        let (store, user, shirt, hat) = setup().await;
        let carts = CartService::new(&store);
        carts.add_to_cart(user, shirt.id, 1).await.unwrap();
        carts.add_to_cart(user, hat.id, 1).await.unwrap();
        store.remove_product(hat.id).await;

        let err = OrderService::new(&store)
            .place_order(user, address(), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::StaleProduct(p) if p == hat.id));
        let aggregate = store.load_aggregate(user).await.unwrap().unwrap();
        assert_eq!(aggregate.cart.len(), 2);
    }

    #[tokio::test]
    async fn test_idempotency_key_replays() {
        let (store, user, shirt, _) = setup().await;
        let carts = CartService::new(&store);
        let orders = OrderService::new(&store);
        carts.add_to_cart(user, shirt.id, 1).await.unwrap();

        let first = orders
            .place_order(user, address(), Some(" retry-1 ".to_string()), None)
            .await
            .unwrap();
        // cart is empty now, but the replay must still succeed
        let second = orders
            .place_order(user, address(), Some("retry-1".to_string()), None)
            .await
            .unwrap();
        assert!(second.replayed);
        assert_eq!(first.order.id, second.order.id);
        assert_eq!(first.order.idempotency_key.as_deref(), Some("retry-1"));
    }

    #[tokio::test]
    async fn test_list_orders_newest_first() {
        let (store, user, shirt, _) = setup().await;
        let carts = CartService::new(&store);
        let orders = OrderService::new(&store);

        carts.add_to_cart(user, shirt.id, 1).await.unwrap();
        let older = orders.place_order(user, address(), None, None).await.unwrap();
        carts.add_to_cart(user, shirt.id, 1).await.unwrap();
        let newer = orders.place_order(user, address(), None, None).await.unwrap();

        let listed: Vec<_> = orders
            .list_orders(user)
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(listed, vec![newer.order.id, older.order.id]);

        assert!(matches!(
            orders.list_orders(UserId::generate()).await,
            Err(OrderError::UserNotFound)
        ));
    }
}
