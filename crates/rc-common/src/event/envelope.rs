//! The `{@id, @type, @data}` wire envelope (spec §4.5 / §6).
//!
//! `@id` is the event's unique identifier: generated once per logical
//! emission and reused across outbox retries, so two publishes of "the same
//! logical event" carry the same id — this is what inbox dedup keys on.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A typed envelope ready to publish. `T` is one of the per-topic event
/// enums in `types.rs`, each of which already serializes itself as
/// `{"@type": ..., "@data": ...}` via internal tagging; flattening it here
/// merges in `@id` to produce the full wire envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(rename = "@id")]
    pub id: Uuid,
    #[serde(flatten)]
    pub payload: T,
}

impl<T> Envelope<T> {
    pub fn new(id: Uuid, payload: T) -> Self {
        Self { id, payload }
    }
}

/// The envelope shape before we know which concrete event enum `@type`
/// resolves to — used by the marshaller to decide dispatch before decoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEnvelope {
    #[serde(rename = "@id")]
    pub id: Uuid,
    #[serde(rename = "@type")]
    pub event_type: String,
    #[serde(rename = "@data")]
    pub data: serde_json::Value,
}
