//! Order repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use shopfront_core::{
    DeliveryAddress, Order, OrderId, OrderLine, PricedCart, ProductId, Quantity, UserId,
};

use super::cart::load_cart_on;
use super::products::get_many_on;
use super::users::{lock_user, touch_user};
use super::{OrderRequest, OrderWriteError, PlacedOrder, RepositoryError};

const ORDER_COLUMNS: &str = "id, user_id, total_amount, address, first_name, last_name, \
                             complete_address, phone_number, email_address, idempotency_key, \
                             created_at";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    total_amount: Decimal,
    address: String,
    first_name: String,
    last_name: String,
    complete_address: String,
    phone_number: String,
    email_address: String,
    idempotency_key: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    order_id: OrderId,
    product_id: ProductId,
    title: String,
    quantity: i32,
    unit_price: Decimal,
}

impl OrderItemRow {
    fn into_line(self) -> Result<OrderLine, RepositoryError> {
        let quantity = Quantity::new(i64::from(self.quantity)).map_err(|e| {
            RepositoryError::DataCorruption(format!(
                "invalid quantity in order {}: {e}",
                self.order_id
            ))
        })?;
        Ok(OrderLine {
            product_id: self.product_id,
            title: self.title,
            quantity,
            unit_price: self.unit_price,
        })
    }
}

fn assemble(row: OrderRow, products: Vec<OrderLine>) -> Order {
    Order {
        id: row.id,
        user_id: row.user_id,
        products,
        total_amount: row.total_amount,
        address: row.address,
        delivery_address: DeliveryAddress {
            first_name: row.first_name,
            last_name: row.last_name,
            complete_address: row.complete_address,
            phone_number: row.phone_number,
            email_address: row.email_address,
        },
        idempotency_key: row.idempotency_key,
        created_at: row.created_at,
    }
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Place an order from the user's cart.
    ///
    /// Runs under the user row lock. The order, its items and the cart
    /// deletion commit together or not at all.
    ///
    /// # Errors
    ///
    /// Returns `OrderWriteError::UserNotFound` if the user does not exist,
    /// `OrderWriteError::Checkout` if the address is incomplete, the cart is
    /// empty or references a removed product, and `OrderWriteError::Repository`
    /// on database failure.
    pub async fn place(
        &self,
        user: UserId,
        request: OrderRequest,
    ) -> Result<PlacedOrder, OrderWriteError> {
        let mut tx = self.pool.begin().await?;

        if !lock_user(&mut tx, user).await? {
            return Err(OrderWriteError::UserNotFound);
        }

        if let Some(key) = request.idempotency_key.as_deref()
            && let Some(existing) = find_by_key_on(&mut tx, user, key).await?
        {
            tx.commit().await?;
            return Ok(PlacedOrder {
                order: existing,
                replayed: true,
            });
        }

        request
            .address
            .validate()
            .map_err(shopfront_core::CheckoutError::from)?;

        let cart = load_cart_on(&mut tx, user).await?;
        let ids: Vec<ProductId> = cart.lines().iter().map(|l| l.product_id).collect();
        let products = get_many_on(&mut tx, &ids).await?;
        let priced = PricedCart::price(&cart, &products)?;
        let order = Order::new(
            OrderId::generate(),
            user,
            &request.address,
            priced,
            request.idempotency_key,
            Utc::now(),
        )?;

        let a = &order.delivery_address;
        sqlx::query(
            r"
            INSERT INTO orders
                (id, user_id, total_amount, address, first_name, last_name,
                 complete_address, phone_number, email_address, idempotency_key, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ",
        )
        .bind(order.id)
        .bind(order.user_id)
        .bind(order.total_amount)
        .bind(&order.address)
        .bind(&a.first_name)
        .bind(&a.last_name)
        .bind(&a.complete_address)
        .bind(&a.phone_number)
        .bind(&a.email_address)
        .bind(&order.idempotency_key)
        .bind(order.created_at)
        .execute(&mut *tx)
        .await?;

        for (position, line) in (0_i32..).zip(&order.products) {
            sqlx::query(
                r"
                INSERT INTO order_items (order_id, position, product_id, title, quantity, unit_price)
                VALUES ($1, $2, $3, $4, $5, $6)
                ",
            )
            .bind(order.id)
            .bind(position)
            .bind(line.product_id)
            .bind(&line.title)
            .bind(i32::from(line.quantity))
            .bind(line.unit_price)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user)
            .execute(&mut *tx)
            .await?;
        touch_user(&mut tx, user).await?;

        tx.commit().await?;

        Ok(PlacedOrder {
            order,
            replayed: false,
        })
    }

    /// List a user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_user(&self, user: UserId) -> Result<Vec<Order>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;

        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user)
        .fetch_all(&mut *conn)
        .await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id.as_uuid()).collect();
        let mut items = load_items_on(&mut conn, &ids).await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let (mine, rest): (Vec<_>, Vec<_>) =
                items.into_iter().partition(|i| i.order_id == row.id);
            items = rest;
            let lines = mine
                .into_iter()
                .map(OrderItemRow::into_line)
                .collect::<Result<Vec<_>, _>>()?;
            orders.push(assemble(row, lines));
        }
        Ok(orders)
    }
}

async fn load_items_on(
    conn: &mut PgConnection,
    order_ids: &[Uuid],
) -> Result<Vec<OrderItemRow>, RepositoryError> {
    if order_ids.is_empty() {
        return Ok(Vec::new());
    }
    let items = sqlx::query_as::<_, OrderItemRow>(
        r"
        SELECT order_id, product_id, title, quantity, unit_price
        FROM order_items
        WHERE order_id = ANY($1)
        ORDER BY order_id, position
        ",
    )
    .bind(order_ids)
    .fetch_all(&mut *conn)
    .await?;
    Ok(items)
}

async fn find_by_key_on(
    conn: &mut PgConnection,
    user: UserId,
    key: &str,
) -> Result<Option<Order>, RepositoryError> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 AND idempotency_key = $2"
    ))
    .bind(user)
    .bind(key)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };
    let lines = load_items_on(conn, &[row.id.as_uuid()])
        .await?
        .into_iter()
        .map(OrderItemRow::into_line)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(assemble(row, lines)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use shopfront_core::{CartMutation, CheckoutError};

    use super::*;
    use crate::db::cart::CartRepository;
    use crate::db::test_support::{address, cart_item_count, pool, product, user};

    async fn add(pool: &PgPool, user: UserId, product: ProductId, n: i64) {
        CartRepository::new(pool)
            .apply(
                user,
                CartMutation::Add {
                    product,
                    quantity: Quantity::new(n).unwrap(),
                },
            )
            .await
            .unwrap();
    }

    fn request(key: Option<&str>) -> OrderRequest {
        OrderRequest {
            address: address(),
            idempotency_key: key.map(str::to_owned),
        }
    }

    #[tokio::test]
    #[ignore = "Requires PostgreSQL (set STOREFRONT_DATABASE_URL)"]
    async fn test_place_stores_lines_and_clears_cart() {
        let pool = pool().await;
        let user = user(&pool).await;
        let shirt = product(&pool, 1999).await;
        let hat = product(&pool, 500).await;
        add(&pool, user, shirt.id, 2).await;
        add(&pool, user, hat.id, 1).await;

        let placed = OrderRepository::new(&pool)
            .place(user, request(None))
            .await
            .unwrap();
        assert!(!placed.replayed);
        assert_eq!(placed.order.total_amount, Decimal::new(4498, 2));
        assert_eq!(cart_item_count(&pool, user).await, 0);

        let orders = OrderRepository::new(&pool).list_for_user(user).await.unwrap();
        let stored = orders.first().unwrap();
        assert_eq!(stored.id, placed.order.id);
        assert_eq!(stored.products, placed.order.products);
        assert_eq!(stored.total_amount, placed.order.total_amount);
    }

    #[tokio::test]
    #[ignore = "Requires PostgreSQL (set STOREFRONT_DATABASE_URL)"]
    async fn test_rejected_order_leaves_cart_untouched() {
        let pool = pool().await;
        let repo = OrderRepository::new(&pool);
        let user = user(&pool).await;
        let shirt = product(&pool, 1999).await;
        add(&pool, user, shirt.id, 1).await;
        add(&pool, user, ProductId::generate(), 1).await;

        let err = repo.place(user, request(None)).await.unwrap_err();
        assert!(matches!(
            err,
            OrderWriteError::Checkout(CheckoutError::StaleProduct(_))
        ));

        let mut blank = request(None);
        blank.address.first_name = "  ".to_string();
        let err = repo.place(user, blank).await.unwrap_err();
        assert!(matches!(
            err,
            OrderWriteError::Checkout(CheckoutError::IncompleteAddress(_))
        ));

        assert_eq!(cart_item_count(&pool, user).await, 2);
        assert!(repo.list_for_user(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    #[ignore = "Requires PostgreSQL (set STOREFRONT_DATABASE_URL)"]
    async fn test_empty_cart_is_rejected() {
        let pool = pool().await;
        let user = user(&pool).await;

        let err = OrderRepository::new(&pool)
            .place(user, request(None))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrderWriteError::Checkout(CheckoutError::EmptyCart)
        ));
    }

    #[tokio::test]
    #[ignore = "Requires PostgreSQL (set STOREFRONT_DATABASE_URL)"]
    async fn test_idempotency_key_replays_first_order() {
        let pool = pool().await;
        let repo = OrderRepository::new(&pool);
        let user = user(&pool).await;
        let shirt = product(&pool, 1999).await;
        add(&pool, user, shirt.id, 1).await;

        let first = repo.place(user, request(Some("checkout-1"))).await.unwrap();
        let replay = repo.place(user, request(Some("checkout-1"))).await.unwrap();
        assert!(!first.replayed);
        assert!(replay.replayed);
        assert_eq!(replay.order.id, first.order.id);
        assert_eq!(replay.order.products, first.order.products);

        assert_eq!(repo.list_for_user(user).await.unwrap().len(), 1);
    }
}
