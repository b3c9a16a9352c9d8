//! `rdkafka`-backed [`EventBus`], following `composable-rust-redpanda`'s
//! producer/consumer wiring: a shared `FutureProducer` for publishing, and
//! one `StreamConsumer` per `subscribe` call with manual offset commit so a
//! message is only acknowledged after the caller's handler has run.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::{Message, OwnedMessage};
use rdkafka::producer::{FutureProducer, FutureRecord};

use super::{Ack, Delivery, EventBus};
use crate::event::RawEnvelope;
use crate::{Error, Result};

const PRODUCE_TIMEOUT: Duration = Duration::from_secs(5);

/// Commits one message's offset, cloning the consumer handle so the commit
/// can run independently of the generator that produced the delivery.
struct KafkaAck {
    consumer: Arc<StreamConsumer>,
    message: OwnedMessage,
}

#[async_trait]
impl Ack for KafkaAck {
    async fn ack(&self) -> Result<()> {
        self.consumer
            .commit_message(&self.message, CommitMode::Async)
            .map_err(|e| Error::Broker(format!("failed to commit kafka offset: {e}")))
    }
}

pub struct KafkaEventBus {
    producer: FutureProducer,
    brokers: String,
}

impl KafkaEventBus {
    pub fn new(brokers: &str) -> Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .set("acks", "all")
            .create()
            .map_err(|e| Error::Broker(format!("failed to create kafka producer: {e}")))?;

        Ok(Self { producer, brokers: brokers.to_string() })
    }
}

#[async_trait]
impl EventBus for KafkaEventBus {
    async fn publish(&self, topic: &str, key: &str, envelope: serde_json::Value) -> Result<()> {
        let payload = serde_json::to_vec(&envelope)?;
        let record = FutureRecord::to(topic).key(key).payload(&payload);

        self.producer
            .send(record, PRODUCE_TIMEOUT)
            .await
            .map_err(|(e, _)| Error::Broker(format!("publish to {topic} failed: {e}")))?;

        Ok(())
    }

    async fn subscribe(
        &self,
        topics: &[&str],
        consumer_group: &str,
    ) -> Result<BoxStream<'static, Result<Delivery>>> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &self.brokers)
            .set("group.id", consumer_group)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .create()
            .map_err(|e| Error::Broker(format!("failed to create kafka consumer: {e}")))?;

        consumer
            .subscribe(topics)
            .map_err(|e| Error::Broker(format!("failed to subscribe to {topics:?}: {e}")))?;

        let consumer = Arc::new(consumer);

        let stream = async_stream::stream! {
            loop {
                match consumer.recv().await {
                    Ok(message) => {
                        let topic = message.topic().to_string();
                        let key = message
                            .key()
                            .map(|k| String::from_utf8_lossy(k).into_owned())
                            .unwrap_or_default();

                        let parsed = message
                            .payload()
                            .ok_or_else(|| Error::Fatal(format!("empty payload on {topic}")))
                            .and_then(|bytes| {
                                serde_json::from_slice::<RawEnvelope>(bytes).map_err(Error::from)
                            });

                        match parsed {
                            Ok(envelope) => {
                                // No offset commit here: the caller commits
                                // via `Delivery::ack` only once its handler
                                // has actually succeeded.
                                let ack: Arc<dyn Ack> = Arc::new(KafkaAck { consumer: consumer.clone(), message: message.detach() });
                                yield Ok(Delivery { topic, key, envelope, ack });
                            }
                            Err(e) => yield Err(e),
                        }
                    }
                    Err(e) => yield Err(Error::Broker(format!("kafka recv error: {e}"))),
                }
            }
        };

        Ok(stream.boxed())
    }
}
