//! Account/bill persistence, ported from `core/account.go`.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use rc_common::{Error, Result};

use crate::domain::{Account, Bill};

#[async_trait]
pub trait BillingRepository: Send + Sync {
    async fn create_account_if_not_exists(&self, tx: &mut Transaction<'_, Postgres>, user_id: i64) -> Result<()>;
    async fn find_account_by_user(&self, user_id: i64) -> Result<Account>;
    async fn find_account_by_user_in_tx(&self, tx: &mut Transaction<'_, Postgres>, user_id: i64) -> Result<Account>;
    async fn add_money(&self, tx: &mut Transaction<'_, Postgres>, account_id: i64, delta: Decimal) -> Result<bool>;

    /// `ON CONFLICT (order_id) DO NOTHING`, mirrors `CreateBillIfNotExists`.
    /// Returns the bill either way, so a redelivered `orderConfirmed` finds
    /// the bill it already created.
    async fn create_bill_if_not_exists(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        account_id: i64,
        order_id: i64,
        total: Decimal,
    ) -> Result<Bill>;

    async fn find_bill_by_order_in_tx(&self, tx: &mut Transaction<'_, Postgres>, order_id: i64) -> Result<Bill>;
    async fn find_bill_by_order(&self, order_id: i64) -> Result<Bill>;
    async fn complete_bill(&self, tx: &mut Transaction<'_, Postgres>, bill_id: i64) -> Result<bool>;
}

pub struct PostgresBillingRepository {
    pool: PgPool,
}

impl PostgresBillingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BillingRepository for PostgresBillingRepository {
    async fn create_account_if_not_exists(&self, tx: &mut Transaction<'_, Postgres>, user_id: i64) -> Result<()> {
        sqlx::query("INSERT INTO account (user_id, balance) VALUES ($1, 0) ON CONFLICT (user_id) DO NOTHING")
            .bind(user_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn find_account_by_user(&self, user_id: i64) -> Result<Account> {
        sqlx::query_as("SELECT id, user_id, balance FROM account WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::not_found(format!("account for user {user_id} not found")))
    }

    async fn find_account_by_user_in_tx(&self, tx: &mut Transaction<'_, Postgres>, user_id: i64) -> Result<Account> {
        sqlx::query_as("SELECT id, user_id, balance FROM account WHERE user_id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| Error::not_found(format!("account for user {user_id} not found")))
    }

    async fn add_money(&self, tx: &mut Transaction<'_, Postgres>, account_id: i64, delta: Decimal) -> Result<bool> {
        // Guarded so insufficient funds yields 0 rows (`Ok(false)`) instead
        // of tripping the `balance >= 0` check constraint and returning
        // `Err(Error::Database)`, which the caller can't treat as a
        // rejection.
        let result = sqlx::query("UPDATE account SET balance = balance + $1 WHERE id = $2 AND balance + $1 >= 0")
            .bind(delta)
            .bind(account_id)
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_bill_if_not_exists(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        account_id: i64,
        order_id: i64,
        total: Decimal,
    ) -> Result<Bill> {
        sqlx::query(
            "INSERT INTO bill (account_id, order_id, status, total, created_at)
             VALUES ($1, $2, 'created', $3, now())
             ON CONFLICT (order_id) DO NOTHING",
        )
        .bind(account_id)
        .bind(order_id)
        .bind(total)
        .execute(&mut **tx)
        .await?;

        self.find_bill_by_order_in_tx(tx, order_id).await
    }

    async fn find_bill_by_order_in_tx(&self, tx: &mut Transaction<'_, Postgres>, order_id: i64) -> Result<Bill> {
        sqlx::query_as("SELECT id, account_id, order_id, status, total, created_at FROM bill WHERE order_id = $1")
            .bind(order_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| Error::not_found(format!("bill for order {order_id} not found")))
    }

    async fn find_bill_by_order(&self, order_id: i64) -> Result<Bill> {
        sqlx::query_as("SELECT id, account_id, order_id, status, total, created_at FROM bill WHERE order_id = $1")
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::not_found(format!("bill for order {order_id} not found")))
    }

    async fn complete_bill(&self, tx: &mut Transaction<'_, Postgres>, bill_id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE bill SET status = 'completed' WHERE id = $1 AND status = 'created'")
            .bind(bill_id)
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
