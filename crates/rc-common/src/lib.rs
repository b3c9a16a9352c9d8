//! Shared plumbing for the order saga services: config, error types,
//! database setup, the event envelope/taxonomy, the event bus abstraction,
//! and the outbox/inbox patterns that give the saga at-least-once delivery
//! with consumer-side dedup.

pub mod config;
pub mod db;
pub mod error;
pub mod event;
pub mod event_bus;
pub mod inbox;
pub mod outbox;

pub use config::Config;
pub use error::{Error, Result};
