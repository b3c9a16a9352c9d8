//! The order saga controller (spec §4.2), grounded in
//! `order-service/core/application.go`'s `OrderApplication`. Every
//! customer-facing command resolves prices (if needed) before opening a
//! transaction, then writes the business row and stages the resulting
//! event in the outbox atomically — folding the original's two-step
//! "publish, then self-consume" flow into one local transaction (see
//! DESIGN.md).

use std::sync::Arc;

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use rc_common::event::{topics, Envelope, EventItem, OrderEvent};
use rc_common::{outbox, Error, Result};

use crate::domain::{transition_check, Order, OrderItem, OrderStatus, TransitionOutcome};
use crate::price::PriceResolver;
use crate::repository::OrderRepository;

pub struct OrderSaga {
    pool: PgPool,
    repository: Arc<dyn OrderRepository>,
    price_resolver: Arc<dyn PriceResolver>,
}

impl OrderSaga {
    pub fn new(pool: PgPool, repository: Arc<dyn OrderRepository>, price_resolver: Arc<dyn PriceResolver>) -> Self {
        Self { pool, repository, price_resolver }
    }

    fn to_event_items(items: &[OrderItem]) -> Vec<EventItem> {
        items.iter().map(|i| EventItem { product_id: i.product_id, quantity: i.quantity }).collect()
    }

    async fn stage(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        key: i64,
        event: OrderEvent,
    ) -> Result<()> {
        let envelope = Envelope::new(Uuid::new_v4(), event);
        let payload = rc_common::event::marshaller::encode(&envelope)?;
        outbox::submit(tx, envelope.id, topics::ORDER_EVENTS, &key.to_string(), payload).await?;
        Ok(())
    }

    /// `create` — spec §4.2 step 1: reserve an id, write a `new` order row,
    /// stage `orderCreated`.
    pub async fn create(&self, user_id: i64) -> Result<i64> {
        let order_id = self.repository.next_order_id().await?;
        let mut tx = self.pool.begin().await?;
        self.repository.create(&mut tx, order_id, user_id).await?;
        self.stage(&mut tx, order_id, OrderEvent::OrderCreated { order_id, user_id }).await?;
        tx.commit().await?;
        Ok(order_id)
    }

    async fn load_owned(&self, order_id: i64, user_id: i64) -> Result<Order> {
        let order = self.repository.find(order_id).await?;
        if order.user_id != user_id {
            return Err(Error::not_found(format!("order {order_id} not found")));
        }
        Ok(order)
    }

    /// Shared body for `addItems`/`removeItems`: resolve each item's price
    /// outside any transaction, then apply the signed delta and stage the
    /// corresponding event inside one. Only valid while the order is still
    /// `new` (spec §4.1: forbidden once prepared) — the row is locked via
    /// `find_in_tx` before the check so a concurrent `prepare` can't slip in
    /// between the check and the write.
    async fn adjust_items(
        &self,
        order_id: i64,
        user_id: i64,
        items: &[EventItem],
        sign: i64,
        event_for: impl FnOnce(i64, i64, Vec<EventItem>) -> OrderEvent,
    ) -> Result<()> {
        self.load_owned(order_id, user_id).await?;

        let mut resolved = Vec::with_capacity(items.len());
        for item in items {
            let price = self.price_resolver.resolve(item.product_id, item.quantity).await?;
            resolved.push((item.product_id, item.quantity, price));
        }

        let mut tx = self.pool.begin().await?;
        let order = self.repository.find_in_tx(&mut tx, order_id).await?;
        if order.status != OrderStatus::New {
            return Err(Error::invalid_state(format!("order {order_id} can only be modified while new")));
        }

        for (product_id, quantity, price) in &resolved {
            let applied = self
                .repository
                .adjust_item_quantity(&mut tx, order_id, *product_id, sign * quantity, *price)
                .await?;
            if !applied {
                return Err(Error::invalid_state(format!(
                    "order {order_id} does not have enough of product {product_id} to remove"
                )));
            }
        }
        self.stage(&mut tx, order_id, event_for(order_id, user_id, items.to_vec())).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn add_items(&self, order_id: i64, user_id: i64, items: Vec<EventItem>) -> Result<()> {
        self.adjust_items(order_id, user_id, &items, 1, |order_id, user_id, items| {
            OrderEvent::OrderItemsAdded { order_id, user_id, items }
        })
        .await
    }

    pub async fn remove_items(&self, order_id: i64, user_id: i64, items: Vec<EventItem>) -> Result<()> {
        self.adjust_items(order_id, user_id, &items, -1, |order_id, user_id, items| {
            OrderEvent::OrderItemsRemoved { order_id, user_id, items }
        })
        .await
    }

    /// `reject` — a customer-initiated cancellation, only valid while the
    /// order is still `new`.
    pub async fn reject(&self, order_id: i64, user_id: i64) -> Result<()> {
        self.load_owned(order_id, user_id).await?;

        let mut tx = self.pool.begin().await?;
        let updated = self.repository.update_status(&mut tx, order_id, OrderStatus::New, OrderStatus::Rejected).await?;
        if !updated {
            return Err(Error::invalid_state(format!("order {order_id} is not in a rejectable state")));
        }
        let items = self.repository.items_in_tx(&mut tx, order_id).await?;
        self.stage(&mut tx, order_id, OrderEvent::OrderRejected { order_id, user_id, items: Self::to_event_items(&items) })
            .await?;
        tx.commit().await?;
        Ok(())
    }

    /// `prepare` — spec §8 scenario 6 forbids preparing an empty order.
    pub async fn prepare(&self, order_id: i64, user_id: i64) -> Result<()> {
        self.load_owned(order_id, user_id).await?;

        let mut tx = self.pool.begin().await?;
        let order = self.repository.find_in_tx(&mut tx, order_id).await?;
        if order.total <= Decimal::ZERO {
            return Err(Error::validation("cannot prepare an order with no items"));
        }

        let updated = self.repository.update_status(&mut tx, order_id, OrderStatus::New, OrderStatus::Prepared).await?;
        if !updated {
            return Err(Error::invalid_state(format!("order {order_id} is not in a preparable state")));
        }

        let items = self.repository.items_in_tx(&mut tx, order_id).await?;
        self.stage(
            &mut tx,
            order_id,
            OrderEvent::OrderPrepared { order_id, user_id: order.user_id, total: order.total, items: Self::to_event_items(&items) },
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Apply the idempotence rule against `target`, running the row-level
    /// guarded status update only if the rule says `Apply`. Returns the
    /// order as it stood before the update, and whether it actually ran.
    async fn apply_transition(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        order_id: i64,
        target: OrderStatus,
    ) -> Result<Option<Order>> {
        let order = self.repository.find_in_tx(tx, order_id).await?;
        match transition_check(order.status, target) {
            TransitionOutcome::AlreadyProcessed => Ok(None),
            TransitionOutcome::Invalid => {
                Err(Error::invalid_state(format!("order {order_id} cannot move from {:?} to {:?}", order.status, target)))
            }
            TransitionOutcome::Apply => {
                let updated = self.repository.update_status(tx, order_id, order.status, target).await?;
                if !updated {
                    return Err(Error::invalid_state(format!("order {order_id} status changed concurrently")));
                }
                Ok(Some(order))
            }
        }
    }

    /// `orderWarehouseConfirmed` — flip the flag, then confirm the order if
    /// delivery already confirmed too. Takes the caller's transaction so
    /// the consumer loop can co-commit this with its inbox registration.
    pub async fn on_warehouse_confirmed_tx(&self, tx: &mut sqlx::Transaction<'_, sqlx::Postgres>, order_id: i64) -> Result<()> {
        self.repository.set_warehouse_confirmed(tx, order_id).await?;
        self.try_confirm(tx, order_id).await
    }

    pub async fn on_warehouse_confirmed(&self, order_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        self.on_warehouse_confirmed_tx(&mut tx, order_id).await?;
        tx.commit().await?;
        Ok(())
    }

    /// `orderDeliveryConfirmed` — symmetric to `on_warehouse_confirmed`.
    pub async fn on_delivery_confirmed_tx(&self, tx: &mut sqlx::Transaction<'_, sqlx::Postgres>, order_id: i64) -> Result<()> {
        self.repository.set_delivery_confirmed(tx, order_id).await?;
        self.try_confirm(tx, order_id).await
    }

    pub async fn on_delivery_confirmed(&self, order_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        self.on_delivery_confirmed_tx(&mut tx, order_id).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn try_confirm(&self, tx: &mut sqlx::Transaction<'_, sqlx::Postgres>, order_id: i64) -> Result<()> {
        let order = self.repository.find_in_tx(tx, order_id).await?;
        if !order.both_confirmed() {
            return Ok(());
        }
        if let Some(order) = self.apply_transition(tx, order_id, OrderStatus::Confirmed).await? {
            let items = self.repository.items_in_tx(tx, order_id).await?;
            self.stage(
                tx,
                order_id,
                OrderEvent::OrderConfirmed { order_id, user_id: order.user_id, total: order.total, items: Self::to_event_items(&items) },
            )
            .await?;
        }
        Ok(())
    }

    /// `paymentCompleted` drives the final `Confirmed -> Completed` step.
    pub async fn on_payment_completed_tx(&self, tx: &mut sqlx::Transaction<'_, sqlx::Postgres>, order_id: i64) -> Result<()> {
        if let Some(order) = self.apply_transition(tx, order_id, OrderStatus::Completed).await? {
            let items = self.repository.items_in_tx(tx, order_id).await?;
            self.stage(
                tx,
                order_id,
                OrderEvent::OrderCompleted { order_id, user_id: order.user_id, total: order.total, items: Self::to_event_items(&items) },
            )
            .await?;
        }
        Ok(())
    }

    pub async fn on_payment_completed(&self, order_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        self.on_payment_completed_tx(&mut tx, order_id).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Any participant rejection (`paymentRejected`, `orderWarehouseRejected`,
    /// `orderDeliveryRejected`) rolls the order all the way back. Idempotent:
    /// a second rejection after the first rollback is absorbed by
    /// `apply_transition`'s `AlreadyProcessed` branch.
    pub async fn rollback_tx(&self, tx: &mut sqlx::Transaction<'_, sqlx::Postgres>, order_id: i64) -> Result<()> {
        if let Some(order) = self.apply_transition(tx, order_id, OrderStatus::RolledBack).await? {
            let items = self.repository.items_in_tx(tx, order_id).await?;
            self.stage(
                tx,
                order_id,
                OrderEvent::OrderRolledBack { order_id, user_id: order.user_id, total: order.total, items: Self::to_event_items(&items) },
            )
            .await?;
        }
        Ok(())
    }

    pub async fn rollback(&self, order_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        self.rollback_tx(&mut tx, order_id).await?;
        tx.commit().await?;
        Ok(())
    }
}
