//! The order-service's reaction to participant events (spec §4.2's
//! confirmation/rejection half), wired through the shared inbox so a
//! redelivered message never re-applies its effect: the inbox check, the
//! saga's own transaction, and the inbox registration all co-commit.

use std::sync::Arc;

use futures::StreamExt;
use sqlx::PgPool;

use rc_common::event::marshaller::{self, Decoded};
use rc_common::event::{topics, BillingEvent, DeliveryEvent, WarehouseEvent};
use rc_common::event_bus::EventBus;
use rc_common::inbox::{self, Inbox};

use crate::saga::OrderSaga;

const BILLING_TYPES: &[&str] = &["moneyAdded", "paymentCompleted", "paymentRejected"];
const WAREHOUSE_TYPES: &[&str] = &["orderWarehouseConfirmed", "orderWarehouseRejected", "productsBatchQuantityChanged"];
const DELIVERY_TYPES: &[&str] = &["orderDeliveryConfirmed", "orderDeliveryRejected"];

pub async fn run(
    pool: PgPool,
    bus: Arc<dyn EventBus>,
    inbox: Arc<dyn Inbox>,
    saga: Arc<OrderSaga>,
    consumer_group: String,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    let topics = [topics::BILLING_EVENTS, topics::WAREHOUSE_EVENTS, topics::DELIVERY_EVENTS];
    let mut stream = match bus.subscribe(&topics, &consumer_group).await {
        Ok(stream) => stream,
        Err(e) => {
            tracing::error!(error = %e, "order-service consumer failed to subscribe");
            return;
        }
    };

    loop {
        tokio::select! {
            next = stream.next() => {
                let Some(delivery) = next else { return };
                match delivery {
                    Ok(delivery) => {
                        match handle(&pool, inbox.as_ref(), &saga, &consumer_group, &delivery).await {
                            Ok(()) => {
                                if let Err(e) = delivery.ack.ack().await {
                                    tracing::warn!(error = %e, "failed to ack delivery");
                                }
                            }
                            Err(e) => tracing::error!(error = %e, topic = %delivery.topic, "failed to process participant event"),
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "event bus delivery error"),
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    tracing::info!("order-service consumer shutting down");
                    return;
                }
            }
        }
    }
}

async fn handle(
    pool: &PgPool,
    inbox: &dyn Inbox,
    saga: &OrderSaga,
    consumer_group: &str,
    delivery: &rc_common::event_bus::Delivery,
) -> rc_common::Result<()> {
    let event_id = delivery.envelope.id;

    let outcome = if delivery.topic == topics::BILLING_EVENTS {
        let Decoded::Known(envelope) = marshaller::decode::<BillingEvent>(&delivery.envelope, BILLING_TYPES)? else {
            return Ok(());
        };
        inbox::process_once(pool, inbox, consumer_group, event_id, |tx| {
            let payload = envelope.payload.clone();
            async move {
                match payload {
                    BillingEvent::PaymentCompleted { order_id, .. } => saga.on_payment_completed_tx(tx, order_id).await,
                    BillingEvent::PaymentRejected { order_id, .. } => saga.rollback_tx(tx, order_id).await,
                    BillingEvent::MoneyAdded { .. } => Ok(()),
                }
            }
        })
        .await?
    } else if delivery.topic == topics::WAREHOUSE_EVENTS {
        let Decoded::Known(envelope) = marshaller::decode::<WarehouseEvent>(&delivery.envelope, WAREHOUSE_TYPES)? else {
            return Ok(());
        };
        inbox::process_once(pool, inbox, consumer_group, event_id, |tx| {
            let payload = envelope.payload.clone();
            async move {
                match payload {
                    WarehouseEvent::OrderWarehouseConfirmed { order_id } => saga.on_warehouse_confirmed_tx(tx, order_id).await,
                    WarehouseEvent::OrderWarehouseRejected { order_id, .. } => saga.rollback_tx(tx, order_id).await,
                    WarehouseEvent::ProductsBatchQuantityChanged { .. } => Ok(()),
                }
            }
        })
        .await?
    } else if delivery.topic == topics::DELIVERY_EVENTS {
        let Decoded::Known(envelope) = marshaller::decode::<DeliveryEvent>(&delivery.envelope, DELIVERY_TYPES)? else {
            return Ok(());
        };
        inbox::process_once(pool, inbox, consumer_group, event_id, |tx| {
            let payload = envelope.payload.clone();
            async move {
                match payload {
                    DeliveryEvent::OrderDeliveryConfirmed { order_id } => saga.on_delivery_confirmed_tx(tx, order_id).await,
                    DeliveryEvent::OrderDeliveryRejected { order_id, .. } => saga.rollback_tx(tx, order_id).await,
                }
            }
        })
        .await?
    } else {
        tracing::warn!(topic = %delivery.topic, "unexpected topic in order-service consumer");
        return Ok(());
    };

    if outcome == inbox::ProcessOutcome::Duplicate {
        tracing::debug!(event_id = %event_id, "skipping duplicate event");
    }

    Ok(())
}
