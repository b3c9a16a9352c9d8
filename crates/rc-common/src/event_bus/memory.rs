//! Broadcast-channel backed [`EventBus`] test double, used by saga
//! integration tests that want real publish/subscribe fan-out without a
//! running broker. Delivery is at-least-once only in the sense that a slow
//! subscriber that falls behind the channel's capacity gets `Lagged` and
//! simply misses messages — fine for tests, not a broker substitute.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::broadcast;

use super::{Delivery, EventBus, NoopAck};
use crate::event::RawEnvelope;
use crate::Result;

pub struct InMemoryEventBus {
    sender: broadcast::Sender<Delivery>,
}

impl InMemoryEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn publish(&self, topic: &str, key: &str, envelope: serde_json::Value) -> Result<()> {
        let envelope: RawEnvelope = serde_json::from_value(envelope)?;
        // No subscribers is fine for a test double; broadcast::Sender::send
        // only errors when every receiver has been dropped.
        let _ = self.sender.send(Delivery { topic: topic.to_string(), key: key.to_string(), envelope, ack: Arc::new(NoopAck) });
        Ok(())
    }

    async fn subscribe(
        &self,
        topics: &[&str],
        _consumer_group: &str,
    ) -> Result<BoxStream<'static, Result<Delivery>>> {
        let topics: Vec<String> = topics.iter().map(|t| t.to_string()).collect();
        let receiver = self.sender.subscribe();

        let stream = stream::unfold(receiver, move |mut receiver| {
            let topics = topics.clone();
            async move {
                loop {
                    match receiver.recv().await {
                        Ok(delivery) if topics.contains(&delivery.topic) => {
                            return Some((Ok(delivery), receiver));
                        }
                        Ok(_) => continue,
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => return None,
                    }
                }
            }
        });

        Ok(stream.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn delivers_published_messages_to_subscribers() {
        let bus = InMemoryEventBus::default();
        let mut stream = bus.subscribe(&["order.events"], "test-group").await.unwrap();

        let envelope = serde_json::json!({
            "@id": Uuid::new_v4(),
            "@type": "orderCreated",
            "@data": { "order_id": 1, "user_id": 7 },
        });
        bus.publish("order.events", "1", envelope).await.unwrap();

        let delivery = stream.next().await.unwrap().unwrap();
        assert_eq!(delivery.topic, "order.events");
        assert_eq!(delivery.key, "1");
        assert_eq!(delivery.envelope.event_type, "orderCreated");
    }

    #[tokio::test]
    async fn filters_out_topics_not_subscribed_to() {
        let bus = InMemoryEventBus::default();
        let mut stream = bus.subscribe(&["billing.events"], "test-group").await.unwrap();

        let envelope = serde_json::json!({
            "@id": Uuid::new_v4(),
            "@type": "orderCreated",
            "@data": { "order_id": 1, "user_id": 7 },
        });
        bus.publish("order.events", "1", envelope).await.unwrap();

        let other = serde_json::json!({
            "@id": Uuid::new_v4(),
            "@type": "moneyAdded",
            "@data": { "user_id": 7, "money_added": "10.00" },
        });
        bus.publish("billing.events", "7", other).await.unwrap();

        let delivery = stream.next().await.unwrap().unwrap();
        assert_eq!(delivery.topic, "billing.events");
    }
}
