//! Cart and favorites service.
//!
//! Validates client input, checks product existence, and forwards the
//! resulting [`CartMutation`] to the store, which applies it under the user's
//! write lock.

use thiserror::Error;
use tracing::instrument;

use shopfront_core::{CartError, CartMutation, ProductId, Quantity, QuantityError, UserId};

use crate::db::{CartWriteError, RepositoryError, Store};
use crate::models::cart::{CartEntry, FavoriteEntry};
use crate::models::user::UserAggregate;

/// Errors from cart and favorite operations.
#[derive(Debug, Error)]
pub enum CartServiceError {
    #[error("user not found")]
    UserNotFound,
    #[error("product not found")]
    ProductNotFound(ProductId),
    #[error("product not found in the user's cart")]
    ProductNotInCart(ProductId),
    #[error("invalid quantity: {0}")]
    InvalidQuantity(#[from] QuantityError),
    #[error("cart quantity limit reached")]
    QuantityOverflow(ProductId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<CartWriteError> for CartServiceError {
    fn from(e: CartWriteError) -> Self {
        match e {
            CartWriteError::UserNotFound => Self::UserNotFound,
            CartWriteError::Rule(CartError::ProductNotInCart(p)) => Self::ProductNotInCart(p),
            CartWriteError::Rule(CartError::QuantityOverflow(p)) => Self::QuantityOverflow(p),
            CartWriteError::Repository(e) => Self::Repository(e),
        }
    }
}

/// Cart and favorites operations for one store.
pub struct CartService<'a> {
    store: &'a dyn Store,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    async fn require_product(&self, product: ProductId) -> Result<(), CartServiceError> {
        self.store
            .get_product(product)
            .await?
            .map(|_| ())
            .ok_or(CartServiceError::ProductNotFound(product))
    }

    /// Add `quantity` units of `product`, accumulating onto an existing line.
    ///
    /// Not idempotent: every call adds.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::InvalidQuantity` if `quantity < 1`,
    /// `ProductNotFound` if the product does not exist, and `UserNotFound`
    /// if the user has been deleted.
    #[instrument(skip_all, fields(%user, %product))]
    pub async fn add_to_cart(
        &self,
        user: UserId,
        product: ProductId,
        quantity: i64,
    ) -> Result<UserAggregate, CartServiceError> {
        let quantity = Quantity::new(quantity)?;
        self.require_product(product).await?;
        let aggregate = self
            .store
            .apply_cart(user, CartMutation::Add { product, quantity })
            .await?;
        tracing::debug!(quantity = %quantity, "added to cart");
        Ok(aggregate)
    }

    /// Remove `quantity` units; the line disappears once nothing remains.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::ProductNotInCart` if there is no such line.
    #[instrument(skip_all, fields(%user, %product))]
    pub async fn decrement_line(
        &self,
        user: UserId,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<UserAggregate, CartServiceError> {
        Ok(self
            .store
            .apply_cart(user, CartMutation::Decrement { product, quantity })
            .await?)
    }

    /// Remove the line for `product` whatever its quantity.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::ProductNotInCart` if there is no such line.
    #[instrument(skip_all, fields(%user, %product))]
    pub async fn delete_line(
        &self,
        user: UserId,
        product: ProductId,
    ) -> Result<UserAggregate, CartServiceError> {
        Ok(self
            .store
            .apply_cart(user, CartMutation::Delete { product })
            .await?)
    }

    /// Remove from the cart: a full delete when `quantity` is `None`,
    /// otherwise a decrement.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::InvalidQuantity` if a supplied quantity is
    /// below 1, and `ProductNotInCart` if there is no such line.
    pub async fn remove_from_cart(
        &self,
        user: UserId,
        product: ProductId,
        quantity: Option<i64>,
    ) -> Result<UserAggregate, CartServiceError> {
        match quantity {
            None => self.delete_line(user, product).await,
            Some(q) => {
                let quantity = Quantity::new(q)?;
                self.decrement_line(user, product, quantity).await
            }
        }
    }

    /// Add (`add = true`) or remove a favorite.
    ///
    /// Adding requires the product to exist. Removing a favorite that is not
    /// present succeeds without change.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::ProductNotFound` when adding an unknown
    /// product and `UserNotFound` if the user has been deleted.
    #[instrument(skip_all, fields(%user, %product))]
    pub async fn toggle_favorite(
        &self,
        user: UserId,
        product: ProductId,
        add: bool,
    ) -> Result<UserAggregate, CartServiceError> {
        if add {
            self.require_product(product).await?;
        }
        Ok(self.store.set_favorite(user, product, add).await?)
    }

    async fn aggregate(&self, user: UserId) -> Result<UserAggregate, CartServiceError> {
        self.store
            .load_aggregate(user)
            .await?
            .ok_or(CartServiceError::UserNotFound)
    }

    /// The cart joined with current product data.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::UserNotFound` if the user has been deleted.
    pub async fn list_cart(&self, user: UserId) -> Result<Vec<CartEntry>, CartServiceError> {
        let aggregate = self.aggregate(user).await?;
        let ids: Vec<ProductId> = aggregate
            .cart
            .lines()
            .iter()
            .map(|l| l.product_id)
            .collect();
        let products = self.store.get_products(&ids).await?;
        Ok(CartEntry::resolve(aggregate.cart.lines(), &products))
    }

    /// Favorites joined with current product data.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::UserNotFound` if the user has been deleted.
    pub async fn list_favorites(
        &self,
        user: UserId,
    ) -> Result<Vec<FavoriteEntry>, CartServiceError> {
        let aggregate = self.aggregate(user).await?;
        let products = self.store.get_products(&aggregate.favorites).await?;
        Ok(FavoriteEntry::resolve(&aggregate.favorites, &products))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use rust_decimal::Decimal;
    use shopfront_core::{NewProduct, Price, Product};

    use super::*;
    use crate::db::{CartStore, CatalogStore, MemoryStore, UserStore};
    use crate::models::user::NewUser;

    fn product() -> Product {
        NewProduct {
            title: "Shirt".to_string(),
            name: "Brand".to_string(),
            desc: String::new(),
            img: None,
            price: Price::new(Decimal::from(10), Decimal::from(20), Decimal::from(50)),
            sizes: vec!["M".to_string()],
            category: vec!["Men".to_string()],
        }
        .into_product(ProductId::generate(), Utc::now())
    }

    async fn setup() -> (Arc<MemoryStore>, UserId, Product) {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .create_user(NewUser {
                name: "Ada".to_string(),
                email: shopfront_core::Email::parse("ada@example.com").unwrap(),
                password_hash: "hash".to_string(),
                img: None,
            })
            .await
            .unwrap();
        let shirt = product();
        store.insert_products(vec![shirt.clone()]).await.unwrap();
        (store, user.id, shirt)
    }

    fn qty_of(aggregate: &UserAggregate, product: ProductId) -> Option<u32> {
        aggregate.cart.quantity_of(product).map(Quantity::get)
    }

    #[tokio::test]
    async fn test_add_accumulates_on_one_line() {
        let (store, user, shirt) = setup().await;
        let svc = CartService::new(store.as_ref());

        svc.add_to_cart(user, shirt.id, 2).await.unwrap();
        let aggregate = svc.add_to_cart(user, shirt.id, 3).await.unwrap();
        assert_eq!(aggregate.cart.len(), 1);
        assert_eq!(qty_of(&aggregate, shirt.id), Some(5));
    }

    #[tokio::test]
    async fn test_add_rejects_bad_quantity_and_unknown_product() {
        let (store, user, shirt) = setup().await;
        let svc = CartService::new(store.as_ref());

        assert!(matches!(
            svc.add_to_cart(user, shirt.id, 0).await,
            Err(CartServiceError::InvalidQuantity(_))
        ));
        assert!(matches!(
            svc.add_to_cart(user, shirt.id, -2).await,
            Err(CartServiceError::InvalidQuantity(_))
        ));
        let ghost = ProductId::generate();
        assert!(matches!(
            svc.add_to_cart(user, ghost, 1).await,
            Err(CartServiceError::ProductNotFound(p)) if p == ghost
        ));
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let (store, _, shirt) = setup().await;
        let svc = CartService::new(store.as_ref());
        assert!(matches!(
            svc.add_to_cart(UserId::generate(), shirt.id, 1).await,
            Err(CartServiceError::UserNotFound)
        ));
        assert!(matches!(
            svc.list_cart(UserId::generate()).await,
            Err(CartServiceError::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn test_remove_without_quantity_deletes_line() {
        let (store, user, shirt) = setup().await;
        let svc = CartService::new(store.as_ref());

        svc.add_to_cart(user, shirt.id, 7).await.unwrap();
        let aggregate = svc.remove_from_cart(user, shirt.id, None).await.unwrap();
        assert!(aggregate.cart.is_empty());
    }

    #[tokio::test]
    async fn test_remove_partial_and_overshoot() {
        let (store, user, shirt) = setup().await;
        let svc = CartService::new(store.as_ref());

        svc.add_to_cart(user, shirt.id, 5).await.unwrap();
        let aggregate = svc.remove_from_cart(user, shirt.id, Some(2)).await.unwrap();
        assert_eq!(qty_of(&aggregate, shirt.id), Some(3));

        let aggregate = svc.remove_from_cart(user, shirt.id, Some(3)).await.unwrap();
        assert!(aggregate.cart.is_empty());

        svc.add_to_cart(user, shirt.id, 1).await.unwrap();
        let aggregate = svc.remove_from_cart(user, shirt.id, Some(10)).await.unwrap();
        assert!(aggregate.cart.is_empty());
    }

    #[tokio::test]
    async fn test_remove_rejects_non_positive_quantity() {
        let (store, user, shirt) = setup().await;
        let svc = CartService::new(store.as_ref());

        svc.add_to_cart(user, shirt.id, 2).await.unwrap();
        assert!(matches!(
            svc.remove_from_cart(user, shirt.id, Some(0)).await,
            Err(CartServiceError::InvalidQuantity(_))
        ));
        let aggregate = store.load_aggregate(user).await.unwrap().unwrap();
        assert_eq!(qty_of(&aggregate, shirt.id), Some(2));
    }

    #[tokio::test]
    async fn test_remove_missing_line() {
        let (store, user, shirt) = setup().await;
        let svc = CartService::new(store.as_ref());
        assert!(matches!(
            svc.remove_from_cart(user, shirt.id, None).await,
            Err(CartServiceError::ProductNotInCart(_))
        ));
        assert!(matches!(
            svc.remove_from_cart(user, shirt.id, Some(1)).await,
            Err(CartServiceError::ProductNotInCart(_))
        ));
    }

    #[tokio::test]
    async fn test_example_sequence() {
        let (store, user, shirt) = setup().await;
        let svc = CartService::new(store.as_ref());

        let a = svc.add_to_cart(user, shirt.id, 2).await.unwrap();
        assert_eq!(qty_of(&a, shirt.id), Some(2));
        let a = svc.add_to_cart(user, shirt.id, 1).await.unwrap();
        assert_eq!(qty_of(&a, shirt.id), Some(3));
        let a = svc.remove_from_cart(user, shirt.id, Some(1)).await.unwrap();
        assert_eq!(qty_of(&a, shirt.id), Some(2));
        let a = svc.remove_from_cart(user, shirt.id, None).await.unwrap();
        assert!(a.cart.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_adds_accumulate() {
        let (store, user, shirt) = setup().await;

        let mut handles = Vec::new();
        for _ in 0..10 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                CartService::new(store.as_ref())
                    .add_to_cart(user, shirt.id, 1)
                    .await
                    .map(|_| ())
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let aggregate = store.load_aggregate(user).await.unwrap().unwrap();
        assert_eq!(aggregate.cart.len(), 1);
        assert_eq!(qty_of(&aggregate, shirt.id), Some(10));
    }

    #[tokio::test]
    async fn test_favorites_are_a_set() {
        let (store, user, shirt) = setup().await;
        let svc = CartService::new(store.as_ref());

        svc.toggle_favorite(user, shirt.id, true).await.unwrap();
        let aggregate = svc.toggle_favorite(user, shirt.id, true).await.unwrap();
        assert_eq!(aggregate.favorites, vec![shirt.id]);

        let aggregate = svc.toggle_favorite(user, shirt.id, false).await.unwrap();
        assert!(aggregate.favorites.is_empty());
        // removing again is a no-op, not an error
        let aggregate = svc.toggle_favorite(user, shirt.id, false).await.unwrap();
        assert!(aggregate.favorites.is_empty());
    }

    #[tokio::test]
    async fn test_favorite_requires_existing_product() {
        let (store, user, _) = setup().await;
        let svc = CartService::new(store.as_ref());
        assert!(matches!(
            svc.toggle_favorite(user, ProductId::generate(), true).await,
            Err(CartServiceError::ProductNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_listings_mark_stale_products() {
        let (store, user, shirt) = setup().await;
        let svc = CartService::new(store.as_ref());
        let hat = product();
        store.insert_products(vec![hat.clone()]).await.unwrap();

        svc.add_to_cart(user, shirt.id, 1).await.unwrap();
        svc.add_to_cart(user, hat.id, 2).await.unwrap();
        svc.toggle_favorite(user, hat.id, true).await.unwrap();
        store.remove_product(hat.id).await;

        let cart = svc.list_cart(user).await.unwrap();
        assert_eq!(cart.len(), 2);
        assert!(!cart[0].stale);
        assert_eq!(cart[0].product.as_ref().map(|p| p.id), Some(shirt.id));
        assert!(cart[1].stale);
        assert!(cart[1].product.is_none());
        assert_eq!(cart[1].quantity.get(), 2);

        let favorites = svc.list_favorites(user).await.unwrap();
        assert_eq!(favorites.len(), 1);
        assert!(favorites[0].stale);
    }
}
