//! Stock and idempotence-marker persistence, ported from
//! `warehouse-service/core/warehouse.go`'s `WarehouseRepository`.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use rc_common::{Error, Result};

use crate::domain::StoreItem;

#[async_trait]
pub trait WarehouseRepository: Send + Sync {
    async fn find_item(&self, product_id: i64) -> Result<StoreItem>;

    /// `INSERT INTO processed_orders ... ON CONFLICT DO NOTHING`. Returns
    /// `true` the first time an order is seen, `false` on redelivery.
    async fn mark_processed(&self, tx: &mut Transaction<'_, Postgres>, order_id: i64) -> Result<bool>;

    /// `DELETE FROM processed_orders`. Returns `true` if a row existed to
    /// delete — a rollback for an order that was never reserved (rejected
    /// before warehouse got to it) is a no-op.
    async fn unmark_processed(&self, tx: &mut Transaction<'_, Postgres>, order_id: i64) -> Result<bool>;

    /// Guarded decrement: `WHERE available_quantity >= $1`. Zero rows
    /// affected means the product doesn't exist or doesn't have enough
    /// stock — both collapse to the same compensating outcome.
    async fn reserve(&self, tx: &mut Transaction<'_, Postgres>, product_id: i64, quantity: i64) -> Result<bool>;

    async fn release(&self, tx: &mut Transaction<'_, Postgres>, product_id: i64, quantity: i64) -> Result<()>;
}

pub struct PostgresWarehouseRepository {
    pool: PgPool,
}

impl PostgresWarehouseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WarehouseRepository for PostgresWarehouseRepository {
    async fn find_item(&self, product_id: i64) -> Result<StoreItem> {
        sqlx::query_as("SELECT product_id, available_quantity FROM store_item WHERE product_id = $1")
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::not_found(format!("product {product_id} not found")))
    }

    async fn mark_processed(&self, tx: &mut Transaction<'_, Postgres>, order_id: i64) -> Result<bool> {
        let result = sqlx::query("INSERT INTO processed_orders (order_id) VALUES ($1) ON CONFLICT (order_id) DO NOTHING")
            .bind(order_id)
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn unmark_processed(&self, tx: &mut Transaction<'_, Postgres>, order_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM processed_orders WHERE order_id = $1")
            .bind(order_id)
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn reserve(&self, tx: &mut Transaction<'_, Postgres>, product_id: i64, quantity: i64) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE store_item SET available_quantity = available_quantity - $1
             WHERE product_id = $2 AND available_quantity >= $1",
        )
        .bind(quantity)
        .bind(product_id)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn release(&self, tx: &mut Transaction<'_, Postgres>, product_id: i64, quantity: i64) -> Result<()> {
        let result = sqlx::query("UPDATE store_item SET available_quantity = available_quantity + $1 WHERE product_id = $2")
            .bind(quantity)
            .bind(product_id)
            .execute(&mut **tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found(format!("product {product_id} not found")));
        }
        Ok(())
    }
}
