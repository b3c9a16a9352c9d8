//! Order persistence, ported from `order-service/core/order.go` and
//! `core/items.go`. Expressed as an `async_trait` so the saga controller and
//! consumer loop depend only on [`OrderRepository`], following the
//! teacher's `repository::traits` pattern (`ProductRepositoryTrait` et al.).

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use rc_common::{Error, Result};

use crate::domain::{Order, OrderItem, OrderStatus};

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn next_order_id(&self) -> Result<i64>;
    async fn create(&self, tx: &mut Transaction<'_, Postgres>, order_id: i64, user_id: i64) -> Result<()>;
    async fn find(&self, order_id: i64) -> Result<Order>;
    async fn find_in_tx(&self, tx: &mut Transaction<'_, Postgres>, order_id: i64) -> Result<Order>;
    async fn items(&self, order_id: i64) -> Result<Vec<OrderItem>>;
    async fn items_in_tx(&self, tx: &mut Transaction<'_, Postgres>, order_id: i64) -> Result<Vec<OrderItem>>;

    /// Apply a signed quantity delta to `(order_id, product_id)`, creating
    /// the line if it doesn't exist yet, and adjust the order's running
    /// total by `unit_price * delta`. Mirrors the Go `AddItems`/
    /// `RemoveItems` upsert pair, unified into one delta operation. Returns
    /// `false` (and applies nothing) if the delta would take the line's
    /// quantity negative — removing more of a product than the order has,
    /// or removing a product that was never added.
    async fn adjust_item_quantity(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order_id: i64,
        product_id: i64,
        quantity_delta: i64,
        unit_price: Decimal,
    ) -> Result<bool>;

    /// `UPDATE orders SET status = $to WHERE id = $order_id AND status =
    /// $from`, returning whether a row was actually updated. This is the
    /// row-level guard the saga relies on instead of an application lock.
    async fn update_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order_id: i64,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool>;

    async fn set_warehouse_confirmed(&self, tx: &mut Transaction<'_, Postgres>, order_id: i64) -> Result<()>;
    async fn set_delivery_confirmed(&self, tx: &mut Transaction<'_, Postgres>, order_id: i64) -> Result<()>;
}

pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn next_order_id(&self) -> Result<i64> {
        let id: i64 = sqlx::query_scalar("SELECT nextval('orders_id_seq')").fetch_one(&self.pool).await?;
        Ok(id)
    }

    async fn create(&self, tx: &mut Transaction<'_, Postgres>, order_id: i64, user_id: i64) -> Result<()> {
        sqlx::query(
            "INSERT INTO orders (id, user_id, status, total, warehouse_confirmed, delivery_confirmed, created_at)
             VALUES ($1, $2, 'new', 0, false, false, now())",
        )
        .bind(order_id)
        .bind(user_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn find(&self, order_id: i64) -> Result<Order> {
        sqlx::query_as(
            "SELECT id, user_id, status, total, warehouse_confirmed, delivery_confirmed, created_at
             FROM orders WHERE id = $1",
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::not_found(format!("order {order_id} not found")))
    }

    async fn find_in_tx(&self, tx: &mut Transaction<'_, Postgres>, order_id: i64) -> Result<Order> {
        sqlx::query_as(
            "SELECT id, user_id, status, total, warehouse_confirmed, delivery_confirmed, created_at
             FROM orders WHERE id = $1 FOR UPDATE",
        )
        .bind(order_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| Error::not_found(format!("order {order_id} not found")))
    }

    async fn items(&self, order_id: i64) -> Result<Vec<OrderItem>> {
        let items = sqlx::query_as(
            "SELECT order_id, product_id, quantity, unit_price, line_total
             FROM order_items WHERE order_id = $1",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn items_in_tx(&self, tx: &mut Transaction<'_, Postgres>, order_id: i64) -> Result<Vec<OrderItem>> {
        let items = sqlx::query_as(
            "SELECT order_id, product_id, quantity, unit_price, line_total
             FROM order_items WHERE order_id = $1",
        )
        .bind(order_id)
        .fetch_all(&mut **tx)
        .await?;
        Ok(items)
    }

    async fn adjust_item_quantity(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order_id: i64,
        product_id: i64,
        quantity_delta: i64,
        unit_price: Decimal,
    ) -> Result<bool> {
        let line_delta = unit_price * Decimal::from(quantity_delta);

        // Guarded update for an existing line: `quantity + $1 >= 0` blocks
        // removing more than the order actually has.
        let updated = sqlx::query(
            "UPDATE order_items
             SET quantity = quantity + $1, line_total = line_total + $2
             WHERE order_id = $3 AND product_id = $4 AND quantity + $1 >= 0",
        )
        .bind(quantity_delta)
        .bind(line_delta)
        .bind(order_id)
        .bind(product_id)
        .execute(&mut **tx)
        .await?;

        if updated.rows_affected() == 0 {
            // No existing line moved. A negative delta here means either
            // the line doesn't exist at all or would have gone negative —
            // either way, nothing to apply. A non-negative delta means this
            // is the line's first addition, which falls through to insert.
            if quantity_delta < 0 {
                return Ok(false);
            }

            sqlx::query(
                "INSERT INTO order_items (order_id, product_id, quantity, unit_price, line_total)
                 VALUES ($1, $2, $3, $4, $5)
                 ON CONFLICT (order_id, product_id) DO NOTHING",
            )
            .bind(order_id)
            .bind(product_id)
            .bind(quantity_delta)
            .bind(unit_price)
            .bind(line_delta)
            .execute(&mut **tx)
            .await?;
        }

        sqlx::query("UPDATE orders SET total = total + $1 WHERE id = $2")
            .bind(line_delta)
            .bind(order_id)
            .execute(&mut **tx)
            .await?;

        Ok(true)
    }

    async fn update_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order_id: i64,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool> {
        let result = sqlx::query("UPDATE orders SET status = $1 WHERE id = $2 AND status = $3")
            .bind(to)
            .bind(order_id)
            .bind(from)
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_warehouse_confirmed(&self, tx: &mut Transaction<'_, Postgres>, order_id: i64) -> Result<()> {
        sqlx::query("UPDATE orders SET warehouse_confirmed = true WHERE id = $1 AND status IN ('new', 'prepared')")
            .bind(order_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn set_delivery_confirmed(&self, tx: &mut Transaction<'_, Postgres>, order_id: i64) -> Result<()> {
        sqlx::query("UPDATE orders SET delivery_confirmed = true WHERE id = $1 AND status IN ('new', 'prepared')")
            .bind(order_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}
