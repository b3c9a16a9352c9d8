//! Durable, partitioned, topic-addressable event bus abstraction (spec §2),
//! with at-least-once consume semantics and consumer-group support.
//!
//! The trait shape follows `composable-rust-core::event_bus::EventBus`; the
//! production implementation (`kafka`) wraps `rdkafka`, following
//! `composable-rust-redpanda`'s producer/consumer wiring. A broadcast-
//! channel-backed in-memory implementation (`memory`) is used by saga
//! integration tests that don't want a running broker.

pub mod kafka;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::event::RawEnvelope;
use crate::Result;

/// Commits a single delivery's position in the broker (a Kafka offset, or
/// nothing at all for the in-memory test double). Split out of
/// [`EventBus::subscribe`] so the *caller* decides when to call it — only
/// after its handler has actually succeeded, never unconditionally.
#[async_trait]
pub trait Ack: Send + Sync {
    async fn ack(&self) -> Result<()>;
}

/// Never commits anything; every redelivery of a stream backed by this ack
/// looks like a fresh message, which is fine since the in-memory bus has no
/// persisted offset to track in the first place.
pub struct NoopAck;

#[async_trait]
impl Ack for NoopAck {
    async fn ack(&self) -> Result<()> {
        Ok(())
    }
}

/// One message as delivered to a consumer, carrying enough to commit the
/// inbox/offset after a successful handler run.
#[derive(Clone)]
pub struct Delivery {
    pub topic: String,
    pub key: String,
    pub envelope: RawEnvelope,
    pub ack: Arc<dyn Ack>,
}

#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish `envelope` to `topic`, partitioned by `key` (the aggregate id
    /// as a decimal string, per spec §6) so per-aggregate order is
    /// preserved.
    async fn publish(&self, topic: &str, key: &str, envelope: serde_json::Value) -> Result<()>;

    /// Subscribe to `topics` under `consumer_group`. Messages are delivered
    /// at least once; the caller is responsible for inbox dedup and for
    /// calling `delivery.ack` only after its handler succeeds — the event
    /// bus never commits on its own.
    async fn subscribe(&self, topics: &[&str], consumer_group: &str) -> Result<BoxStream<'static, Result<Delivery>>>;
}
