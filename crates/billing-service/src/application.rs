//! The billing participant (spec §4.6), ported from
//! `billing-service/core/application.go`'s `BillingApplication`.

use std::sync::Arc;

use rust_decimal::Decimal;
use sqlx::{Acquire, PgPool, Postgres, Transaction};
use uuid::Uuid;

use rc_common::event::{topics, BillingEvent, Envelope};
use rc_common::event_bus::EventBus;
use rc_common::{outbox, Error, Result};

use crate::repository::BillingRepository;

pub struct BillingApplication {
    pool: PgPool,
    repository: Arc<dyn BillingRepository>,
    bus: Arc<dyn EventBus>,
}

impl BillingApplication {
    pub fn new(pool: PgPool, repository: Arc<dyn BillingRepository>, bus: Arc<dyn EventBus>) -> Self {
        Self { pool, repository, bus }
    }

    async fn stage(&self, tx: &mut Transaction<'_, Postgres>, key: i64, event: BillingEvent) -> Result<()> {
        let envelope = Envelope::new(Uuid::new_v4(), event);
        let payload = rc_common::event::marshaller::encode(&envelope)?;
        outbox::submit(tx, envelope.id, topics::BILLING_EVENTS, &key.to_string(), payload).await?;
        Ok(())
    }

    /// `orderConfirmed` consumer — spec §4.6 step by step: create the bill
    /// (idempotent on `order_id`), debit the account, mark the bill
    /// completed, stage `paymentCompleted`, all inside a savepoint nested
    /// in `tx`. Insufficient funds rolls back just that savepoint — not the
    /// whole `tx` — so the caller's inbox registration still commits, and
    /// `paymentRejected` goes out directly instead (spec: "no outbox — it
    /// is a fresh, compensating event that does not co-commit with a
    /// business write"). A rejected payment is terminal for this order, the
    /// same way `RolledBack` is terminal in the order state machine.
    pub async fn pay_order_tx(&self, tx: &mut Transaction<'_, Postgres>, user_id: i64, order_id: i64, total: Decimal) -> Result<()> {
        let mut savepoint = tx.begin().await?;

        match self.attempt_payment(&mut savepoint, user_id, order_id, total).await {
            Ok(()) => {
                savepoint.commit().await?;
                Ok(())
            }
            Err(e) if e.category() == "invalid_state" => {
                savepoint.rollback().await?;
                self.emit_payment_rejected(order_id, &e.to_string()).await
            }
            Err(e) => Err(e),
        }
    }

    pub async fn pay_order(&self, user_id: i64, order_id: i64, total: Decimal) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        self.pay_order_tx(&mut tx, user_id, order_id, total).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn attempt_payment(&self, tx: &mut Transaction<'_, Postgres>, user_id: i64, order_id: i64, total: Decimal) -> Result<()> {
        let account = self.repository.find_account_by_user_in_tx(tx, user_id).await?;
        let bill = self.repository.create_bill_if_not_exists(tx, account.id, order_id, total).await?;

        let debited = self.repository.add_money(tx, bill.account_id, -bill.total).await?;
        if !debited {
            return Err(Error::invalid_state(format!("insufficient funds for user {user_id}")));
        }

        let completed = self.repository.complete_bill(tx, bill.id).await?;
        if !completed {
            // Already completed by a prior delivery of this same event.
            return Ok(());
        }

        self.stage(tx, order_id, BillingEvent::PaymentCompleted { bill_id: bill.id, order_id, account_id: bill.account_id })
            .await
    }

    async fn emit_payment_rejected(&self, order_id: i64, reason: &str) -> Result<()> {
        // Published straight to the broker rather than through the
        // outbox: it's a fresh compensating event with no local write to
        // co-commit with (spec §4.6).
        let envelope = Envelope::new(Uuid::new_v4(), BillingEvent::PaymentRejected { order_id, reason: reason.to_string() });
        let payload = rc_common::event::marshaller::encode(&envelope)?;
        self.bus.publish(topics::BILLING_EVENTS, &order_id.to_string(), payload).await
    }
}
