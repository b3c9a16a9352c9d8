//! The delivery participant: courier assignment and the `orderPrepared` /
//! `orderRolledBack` consumer that reserves and releases it for the order
//! saga.

pub mod application;
pub mod consumer;
pub mod domain;
pub mod http;
pub mod migrations;
pub mod repository;

pub use application::DeliveryApplication;
