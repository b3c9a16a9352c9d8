//! The warehouse participant (spec §4.7), ported from
//! `warehouse-service/core/application.go` / `core/warehouse.go`.

use std::sync::Arc;

use sqlx::{Acquire, PgPool, Postgres, Transaction};
use uuid::Uuid;

use rc_common::event::{topics, EventItem, Envelope, ProductQuantityChange, WarehouseEvent};
use rc_common::event_bus::EventBus;
use rc_common::{outbox, Error, Result};

use crate::repository::WarehouseRepository;

pub struct WarehouseApplication {
    pool: PgPool,
    repository: Arc<dyn WarehouseRepository>,
    bus: Arc<dyn EventBus>,
}

impl WarehouseApplication {
    pub fn new(pool: PgPool, repository: Arc<dyn WarehouseRepository>, bus: Arc<dyn EventBus>) -> Self {
        Self { pool, repository, bus }
    }

    async fn stage(&self, tx: &mut Transaction<'_, Postgres>, key: i64, event: WarehouseEvent) -> Result<()> {
        let envelope = Envelope::new(Uuid::new_v4(), event);
        let payload = rc_common::event::marshaller::encode(&envelope)?;
        outbox::submit(tx, envelope.id, topics::WAREHOUSE_EVENTS, &key.to_string(), payload).await?;
        Ok(())
    }

    /// `orderPrepared` consumer — spec §9: reserve every item's stock and
    /// confirm, or roll back the attempt (not the whole transaction — the
    /// idempotence marker still commits) and reject directly. Redelivery
    /// of an already-processed order is a pure no-op.
    pub async fn on_order_prepared_tx(&self, tx: &mut Transaction<'_, Postgres>, order_id: i64, items: &[EventItem]) -> Result<()> {
        // `mark_processed` runs inside the savepoint, not the outer tx: a
        // rejected reservation must leave no `processed_orders` row behind,
        // or the later `orderRolledBack` handler would see the order as
        // processed and release stock that was never decremented.
        let mut savepoint = tx.begin().await?;
        match self.attempt_reservation(&mut savepoint, order_id, items).await {
            Ok(Some(())) => {
                savepoint.commit().await?;
                Ok(())
            }
            Ok(None) => {
                savepoint.rollback().await?;
                Ok(())
            }
            Err(e) if e.category() == "invalid_state" => {
                savepoint.rollback().await?;
                self.emit_warehouse_rejected(order_id, &e.to_string()).await
            }
            Err(e) => Err(e),
        }
    }

    pub async fn on_order_prepared(&self, order_id: i64, items: &[EventItem]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        self.on_order_prepared_tx(&mut tx, order_id, items).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn attempt_reservation(&self, tx: &mut Transaction<'_, Postgres>, order_id: i64, items: &[EventItem]) -> Result<Option<()>> {
        if !self.repository.mark_processed(tx, order_id).await? {
            return Ok(None);
        }

        for item in items {
            let reserved = self.repository.reserve(tx, item.product_id, item.quantity).await?;
            if !reserved {
                return Err(Error::invalid_state(format!(
                    "insufficient stock for product {} (order {order_id})",
                    item.product_id
                )));
            }
        }

        self.stage(tx, order_id, WarehouseEvent::OrderWarehouseConfirmed { order_id }).await?;
        self.stage(
            tx,
            order_id,
            WarehouseEvent::ProductsBatchQuantityChanged {
                changes: items
                    .iter()
                    .map(|i| ProductQuantityChange { product_id: i.product_id, quantity: i.quantity, increase: false })
                    .collect(),
            },
        )
        .await?;

        Ok(Some(()))
    }

    async fn emit_warehouse_rejected(&self, order_id: i64, reason: &str) -> Result<()> {
        let envelope = Envelope::new(Uuid::new_v4(), WarehouseEvent::OrderWarehouseRejected { order_id, reason: reason.to_string() });
        let payload = rc_common::event::marshaller::encode(&envelope)?;
        self.bus.publish(topics::WAREHOUSE_EVENTS, &order_id.to_string(), payload).await
    }

    /// `orderRolledBack` consumer — mirror of `on_order_prepared`: releases
    /// whatever was reserved and clears the idempotence marker. A no-op if
    /// this order was never reserved in the first place (rejected earlier
    /// in the saga, before warehouse ever ran).
    pub async fn on_order_rolled_back_tx(&self, tx: &mut Transaction<'_, Postgres>, order_id: i64, items: &[EventItem]) -> Result<()> {
        if !self.repository.unmark_processed(tx, order_id).await? {
            return Ok(());
        }

        for item in items {
            self.repository.release(tx, item.product_id, item.quantity).await?;
        }

        self.stage(
            tx,
            order_id,
            WarehouseEvent::ProductsBatchQuantityChanged {
                changes: items
                    .iter()
                    .map(|i| ProductQuantityChange { product_id: i.product_id, quantity: i.quantity, increase: true })
                    .collect(),
            },
        )
        .await
    }

    pub async fn on_order_rolled_back(&self, order_id: i64, items: &[EventItem]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        self.on_order_rolled_back_tx(&mut tx, order_id, items).await?;
        tx.commit().await?;
        Ok(())
    }
}
