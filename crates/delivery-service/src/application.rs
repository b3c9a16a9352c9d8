//! The delivery participant (spec §4.8), ported from
//! `delivery-service/core/delivery.go`'s `reserveCourier`/`freeCourier`,
//! with the courier race closed per the redesign (`SELECT ... FOR UPDATE`
//! on the candidate courier row).

use std::sync::Arc;

use chrono::NaiveDate;
use sqlx::{Acquire, PgPool, Postgres, Transaction};
use uuid::Uuid;

use rc_common::event::{topics, DeliveryEvent, Envelope};
use rc_common::event_bus::EventBus;
use rc_common::{outbox, Error, Result};

use crate::repository::DeliveryRepository;

pub struct DeliveryApplication {
    pool: PgPool,
    repository: Arc<dyn DeliveryRepository>,
    bus: Arc<dyn EventBus>,
}

impl DeliveryApplication {
    pub fn new(pool: PgPool, repository: Arc<dyn DeliveryRepository>, bus: Arc<dyn EventBus>) -> Self {
        Self { pool, repository, bus }
    }

    async fn stage(&self, tx: &mut Transaction<'_, Postgres>, key: i64, event: DeliveryEvent) -> Result<()> {
        let envelope = Envelope::new(Uuid::new_v4(), event);
        let payload = rc_common::event::marshaller::encode(&envelope)?;
        outbox::submit(tx, envelope.id, topics::DELIVERY_EVENTS, &key.to_string(), payload).await?;
        Ok(())
    }

    /// `orderPrepared` consumer: reserve a courier for whatever date the
    /// user submitted earlier via [`DeliveryRepository::submit`]. If no
    /// delivery request was ever submitted for this order, this is a
    /// silent no-op — the same gap the original implementation has, not a
    /// redesign target (see DESIGN.md).
    pub async fn on_order_prepared_tx(&self, tx: &mut Transaction<'_, Postgres>, order_id: i64) -> Result<()> {
        if !self.repository.mark_processed(tx, order_id).await? {
            return Ok(());
        }

        let mut savepoint = tx.begin().await?;
        match self.attempt_assignment(&mut savepoint, order_id).await {
            Ok(()) => {
                savepoint.commit().await?;
                Ok(())
            }
            Err(e) if e.category() == "not_found" => {
                // No delivery request submitted for this order yet.
                savepoint.rollback().await?;
                Ok(())
            }
            Err(e) if e.category() == "invalid_state" => {
                savepoint.rollback().await?;
                self.emit_delivery_rejected(order_id, &e.to_string()).await
            }
            Err(e) => Err(e),
        }
    }

    pub async fn on_order_prepared(&self, order_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        self.on_order_prepared_tx(&mut tx, order_id).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn attempt_assignment(&self, tx: &mut Transaction<'_, Postgres>, order_id: i64) -> Result<()> {
        let delivery = self.repository.find_by_order_in_tx(tx, order_id).await?;

        let Some(courier_id) = self.repository.find_free_courier_for_update(tx, delivery.date).await? else {
            return Err(Error::invalid_state(format!("no courier available on {}", delivery.date)));
        };

        self.repository.assign_courier(tx, order_id, courier_id).await?;
        self.stage(tx, order_id, DeliveryEvent::OrderDeliveryConfirmed { order_id }).await
    }

    async fn emit_delivery_rejected(&self, order_id: i64, reason: &str) -> Result<()> {
        let envelope = Envelope::new(Uuid::new_v4(), DeliveryEvent::OrderDeliveryRejected { order_id, reason: reason.to_string() });
        let payload = rc_common::event::marshaller::encode(&envelope)?;
        self.bus.publish(topics::DELIVERY_EVENTS, &order_id.to_string(), payload).await
    }

    /// `orderRolledBack` consumer: release the courier. A no-op if this
    /// order was never reserved.
    pub async fn on_order_rolled_back_tx(&self, tx: &mut Transaction<'_, Postgres>, order_id: i64) -> Result<()> {
        if !self.repository.unmark_processed(tx, order_id).await? {
            return Ok(());
        }
        self.repository.clear_courier(tx, order_id).await
    }

    pub async fn on_order_rolled_back(&self, order_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        self.on_order_rolled_back_tx(&mut tx, order_id).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn submit_delivery(&self, order_id: i64, address: &str, date: NaiveDate) -> Result<()> {
        self.repository.submit(order_id, address, date).await
    }
}
