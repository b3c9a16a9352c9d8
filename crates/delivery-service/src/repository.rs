//! Delivery/courier persistence, ported from
//! `delivery-service/core/delivery.go`'s `DeliveryRepository`.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, Transaction};

use rc_common::{Error, Result};

use crate::domain::Delivery;

#[async_trait]
pub trait DeliveryRepository: Send + Sync {
    /// `ON CONFLICT (order_id) DO UPDATE`, the user-submitted delivery
    /// request (address + requested date), independent of the order saga.
    async fn submit(&self, order_id: i64, address: &str, date: NaiveDate) -> Result<()>;

    async fn find_by_order(&self, order_id: i64) -> Result<Delivery>;
    async fn find_by_order_in_tx(&self, tx: &mut Transaction<'_, Postgres>, order_id: i64) -> Result<Delivery>;

    async fn mark_processed(&self, tx: &mut Transaction<'_, Postgres>, order_id: i64) -> Result<bool>;
    async fn unmark_processed(&self, tx: &mut Transaction<'_, Postgres>, order_id: i64) -> Result<bool>;

    /// Picks the first courier whose same-day assignment count is below
    /// `max_per_day`, locking the candidate row (`FOR UPDATE`) so two
    /// concurrent reservations on the same date can't both pick it — the
    /// race the original implementation left open.
    async fn find_free_courier_for_update(&self, tx: &mut Transaction<'_, Postgres>, date: NaiveDate) -> Result<Option<i64>>;

    async fn assign_courier(&self, tx: &mut Transaction<'_, Postgres>, order_id: i64, courier_id: i64) -> Result<()>;
    async fn clear_courier(&self, tx: &mut Transaction<'_, Postgres>, order_id: i64) -> Result<()>;
}

pub struct PostgresDeliveryRepository {
    pool: PgPool,
}

impl PostgresDeliveryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeliveryRepository for PostgresDeliveryRepository {
    async fn submit(&self, order_id: i64, address: &str, date: NaiveDate) -> Result<()> {
        sqlx::query(
            "INSERT INTO delivery (order_id, address, date) VALUES ($1, $2, $3)
             ON CONFLICT (order_id) DO UPDATE SET address = $2, date = $3",
        )
        .bind(order_id)
        .bind(address)
        .bind(date)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_order(&self, order_id: i64) -> Result<Delivery> {
        sqlx::query_as("SELECT order_id, address, date, courier_id FROM delivery WHERE order_id = $1")
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::not_found(format!("delivery for order {order_id} not found")))
    }

    async fn find_by_order_in_tx(&self, tx: &mut Transaction<'_, Postgres>, order_id: i64) -> Result<Delivery> {
        sqlx::query_as("SELECT order_id, address, date, courier_id FROM delivery WHERE order_id = $1 FOR UPDATE")
            .bind(order_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| Error::not_found(format!("delivery for order {order_id} not found")))
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

    async fn find_free_courier_for_update(&self, tx: &mut Transaction<'_, Postgres>, date: NaiveDate) -> Result<Option<i64>> {
        let courier_id: Option<i64> = sqlx::query_scalar(
            "WITH reserved AS (
                 SELECT courier_id, count(1) AS orders
                 FROM delivery
                 WHERE date = $1 AND courier_id IS NOT NULL
                 GROUP BY courier_id
             )
             SELECT c.courier_id
             FROM courier c
             LEFT JOIN reserved r ON c.courier_id = r.courier_id
             WHERE r.orders IS NULL OR c.max_per_day > r.orders
             ORDER BY c.courier_id
             LIMIT 1
             FOR UPDATE OF c",
        )
        .bind(date)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(courier_id)
    }

    async fn assign_courier(&self, tx: &mut Transaction<'_, Postgres>, order_id: i64, courier_id: i64) -> Result<()> {
        sqlx::query("UPDATE delivery SET courier_id = $1 WHERE order_id = $2")
            .bind(courier_id)
            .bind(order_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn clear_courier(&self, tx: &mut Transaction<'_, Postgres>, order_id: i64) -> Result<()> {
        sqlx::query("UPDATE delivery SET courier_id = NULL WHERE order_id = $1")
            .bind(order_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}
