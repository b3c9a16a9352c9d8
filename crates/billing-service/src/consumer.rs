//! Billing's reaction to the order saga and user lifecycle (spec §4.6).

use std::sync::Arc;

use futures::StreamExt;
use sqlx::PgPool;

use rc_common::event::marshaller::{self, Decoded};
use rc_common::event::{topics, OrderEvent};
use rc_common::event_bus::EventBus;
use rc_common::inbox::{self, Inbox};

use crate::application::BillingApplication;

// Billing only reacts to `orderConfirmed`; every other order event is left
// undecoded by the marshaller and skipped below.
const ORDER_TYPES: &[&str] = &["orderConfirmed"];

pub async fn run(
    pool: PgPool,
    bus: Arc<dyn EventBus>,
    inbox: Arc<dyn Inbox>,
    app: Arc<BillingApplication>,
    consumer_group: String,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    let topics = [topics::ORDER_EVENTS];
    let mut stream = match bus.subscribe(&topics, &consumer_group).await {
        Ok(stream) => stream,
        Err(e) => {
            tracing::error!(error = %e, "billing-service consumer failed to subscribe");
            return;
        }
    };

    loop {
        tokio::select! {
            next = stream.next() => {
                let Some(delivery) = next else { return };
                match delivery {
                    Ok(delivery) => {
                        match handle(&pool, inbox.as_ref(), &app, &consumer_group, &delivery).await {
                            Ok(()) => {
                                if let Err(e) = delivery.ack.ack().await {
                                    tracing::warn!(error = %e, "failed to ack delivery");
                                }
                            }
                            Err(e) => tracing::error!(error = %e, "failed to process order event"),
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "event bus delivery error"),
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    tracing::info!("billing-service consumer shutting down");
                    return;
                }
            }
        }
    }
}

async fn handle(
    pool: &PgPool,
    inbox: &dyn Inbox,
    app: &BillingApplication,
    consumer_group: &str,
    delivery: &rc_common::event_bus::Delivery,
) -> rc_common::Result<()> {
    let event_id = delivery.envelope.id;

    let Decoded::Known(envelope) = marshaller::decode::<OrderEvent>(&delivery.envelope, ORDER_TYPES)? else {
        return Ok(());
    };

    let OrderEvent::OrderConfirmed { user_id, order_id, total, .. } = envelope.payload;

    inbox::process_once(pool, inbox, consumer_group, event_id, |tx| {
        app.pay_order_tx(tx, user_id, order_id, total)
    })
    .await?;

    Ok(())
}
