//! Cart and favorites repository.
//!
//! Every write runs in a transaction that first locks the owning `users` row,
//! so concurrent mutations of one cart are applied one after another. The
//! cart itself is loaded, changed with [`shopfront_core::Cart::apply`], and
//! only the affected line is written back.

use sqlx::{PgConnection, PgPool};

use shopfront_core::{
    Cart, CartLine, CartMutation, LineChange, OrderId, ProductId, Quantity, UserId,
};

use super::users::{get_user_on, lock_user, touch_user};
use super::{CartWriteError, RepositoryError};
use crate::models::user::UserAggregate;

/// Repository for cart and favorite database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Load the full aggregate for a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn load(&self, user: UserId) -> Result<Option<UserAggregate>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        load_aggregate_on(&mut conn, user).await
    }

    /// Apply a cart mutation under the user row lock.
    ///
    /// # Errors
    ///
    /// Returns `CartWriteError::UserNotFound` if the user does not exist,
    /// `CartWriteError::Rule` if the cart rules reject the mutation, and
    /// `CartWriteError::Repository` on database failure.
    pub async fn apply(
        &self,
        user: UserId,
        mutation: CartMutation,
    ) -> Result<UserAggregate, CartWriteError> {
        let mut tx = self.pool.begin().await?;

        if !lock_user(&mut tx, user).await? {
            return Err(CartWriteError::UserNotFound);
        }

        let mut cart = load_cart_on(&mut tx, user).await?;
        match cart.apply(mutation)? {
            LineChange::Upserted(line) => {
                sqlx::query(
                    r"
                    INSERT INTO cart_items (user_id, product_id, quantity)
                    VALUES ($1, $2, $3)
                    ON CONFLICT (user_id, product_id) DO UPDATE SET quantity = EXCLUDED.quantity
                    ",
                )
                .bind(user)
                .bind(line.product_id)
                .bind(i32::from(line.quantity))
                .execute(&mut *tx)
                .await?;
            }
            LineChange::Removed(product) => {
                sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
                    .bind(user)
                    .bind(product)
                    .execute(&mut *tx)
                    .await?;
            }
        }
        touch_user(&mut tx, user).await?;

        let aggregate = load_aggregate_on(&mut tx, user)
            .await?
            .ok_or(CartWriteError::UserNotFound)?;
        tx.commit().await?;

        Ok(aggregate)
    }

    /// Add or remove a favorite under the user row lock.
    ///
    /// # Errors
    ///
    /// Returns `CartWriteError::UserNotFound` if the user does not exist and
    /// `CartWriteError::Repository` on database failure.
    pub async fn set_favorite(
        &self,
        user: UserId,
        product: ProductId,
        favorite: bool,
    ) -> Result<UserAggregate, CartWriteError> {
        let mut tx = self.pool.begin().await?;

        if !lock_user(&mut tx, user).await? {
            return Err(CartWriteError::UserNotFound);
        }

        let changed = if favorite {
            sqlx::query(
                r"
                INSERT INTO favorites (user_id, product_id)
                VALUES ($1, $2)
                ON CONFLICT (user_id, product_id) DO NOTHING
                ",
            )
            .bind(user)
            .bind(product)
            .execute(&mut *tx)
            .await?
        } else {
            sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND product_id = $2")
                .bind(user)
                .bind(product)
                .execute(&mut *tx)
                .await?
        };
        if changed.rows_affected() > 0 {
            touch_user(&mut tx, user).await?;
        }

        let aggregate = load_aggregate_on(&mut tx, user)
            .await?
            .ok_or(CartWriteError::UserNotFound)?;
        tx.commit().await?;

        Ok(aggregate)
    }
}

/// Load a user's cart lines in insertion order.
pub(crate) async fn load_cart_on(
    conn: &mut PgConnection,
    user: UserId,
) -> Result<Cart, RepositoryError> {
    let rows: Vec<(ProductId, i32)> = sqlx::query_as(
        "SELECT product_id, quantity FROM cart_items WHERE user_id = $1 ORDER BY id",
    )
    .bind(user)
    .fetch_all(&mut *conn)
    .await?;

    let lines = rows
        .into_iter()
        .map(|(product_id, quantity)| {
            let quantity = Quantity::new(i64::from(quantity)).map_err(|e| {
                RepositoryError::DataCorruption(format!(
                    "invalid cart quantity for product {product_id}: {e}"
                ))
            })?;
            Ok(CartLine {
                product_id,
                quantity,
            })
        })
        .collect::<Result<Vec<_>, RepositoryError>>()?;

    Cart::from_lines(lines).map_err(|e| {
        RepositoryError::DataCorruption(format!("cart lines cannot be merged: {e}"))
    })
}

/// Load the aggregate on an existing connection or transaction.
pub(crate) async fn load_aggregate_on(
    conn: &mut PgConnection,
    user: UserId,
) -> Result<Option<UserAggregate>, RepositoryError> {
    let Some(account) = get_user_on(conn, user).await? else {
        return Ok(None);
    };

    let cart = load_cart_on(conn, user).await?;

    let favorites: Vec<ProductId> = sqlx::query_scalar(
        "SELECT product_id FROM favorites WHERE user_id = $1 ORDER BY created_at, product_id",
    )
    .bind(user)
    .fetch_all(&mut *conn)
    .await?;

    let orders: Vec<OrderId> =
        sqlx::query_scalar("SELECT id FROM orders WHERE user_id = $1 ORDER BY created_at, id")
            .bind(user)
            .fetch_all(&mut *conn)
            .await?;

    Ok(Some(UserAggregate {
        user: account,
        cart,
        favorites,
        orders,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tokio::task::JoinSet;

    use super::*;
    use crate::db::test_support::{cart_item_count, pool, product, user};

    fn qty(n: i64) -> Quantity {
        Quantity::new(n).unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ignore = "Requires PostgreSQL (set STOREFRONT_DATABASE_URL)"]
    async fn test_concurrent_adds_are_serialized() {
        let pool = pool().await;
        let user = user(&pool).await;
        let p = product(&pool, 1999).await.id;

        let mut tasks = JoinSet::new();
        for _ in 0..10 {
            let pool = pool.clone();
            tasks.spawn(async move {
                CartRepository::new(&pool)
                    .apply(
                        user,
                        CartMutation::Add {
                            product: p,
                            quantity: Quantity::ONE,
                        },
                    )
                    .await
                    .unwrap();
            });
        }
        while let Some(joined) = tasks.join_next().await {
            joined.unwrap();
        }

        let aggregate = CartRepository::new(&pool).load(user).await.unwrap().unwrap();
        assert_eq!(aggregate.cart.quantity_of(p), Some(qty(10)));
        assert_eq!(cart_item_count(&pool, user).await, 1);
    }

    #[tokio::test]
    #[ignore = "Requires PostgreSQL (set STOREFRONT_DATABASE_URL)"]
    async fn test_decrement_past_zero_removes_line() {
        let pool = pool().await;
        let repo = CartRepository::new(&pool);
        let user = user(&pool).await;
        let p = product(&pool, 1999).await.id;

        repo.apply(
            user,
            CartMutation::Add {
                product: p,
                quantity: qty(5),
            },
        )
        .await
        .unwrap();

        let partial = repo
            .apply(
                user,
                CartMutation::Decrement {
                    product: p,
                    quantity: qty(2),
                },
            )
            .await
            .unwrap();
        assert_eq!(partial.cart.quantity_of(p), Some(qty(3)));

        let overshoot = repo
            .apply(
                user,
                CartMutation::Decrement {
                    product: p,
                    quantity: qty(7),
                },
            )
            .await
            .unwrap();
        assert!(overshoot.cart.is_empty());
        assert_eq!(cart_item_count(&pool, user).await, 0);
    }

    #[tokio::test]
    #[ignore = "Requires PostgreSQL (set STOREFRONT_DATABASE_URL)"]
    async fn test_favorites_are_idempotent() {
        let pool = pool().await;
        let repo = CartRepository::new(&pool);
        let user = user(&pool).await;
        let p = product(&pool, 1999).await.id;

        repo.set_favorite(user, p, true).await.unwrap();
        let twice = repo.set_favorite(user, p, true).await.unwrap();
        assert_eq!(twice.favorites, vec![p]);

        let removed = repo.set_favorite(user, p, false).await.unwrap();
        assert!(removed.favorites.is_empty());
        let absent = repo.set_favorite(user, p, false).await.unwrap();
        assert!(absent.favorites.is_empty());
    }

    #[tokio::test]
    #[ignore = "Requires PostgreSQL (set STOREFRONT_DATABASE_URL)"]
    async fn test_unknown_user_is_rejected() {
        let pool = pool().await;
        let err = CartRepository::new(&pool)
            .apply(
                UserId::generate(),
                CartMutation::Add {
                    product: ProductId::generate(),
                    quantity: Quantity::ONE,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CartWriteError::UserNotFound));
    }
}
