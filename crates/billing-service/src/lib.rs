//! The billing participant: account ledger, bill lifecycle, and the
//! `orderConfirmed` consumer that debits funds for the order saga.

pub mod application;
pub mod consumer;
pub mod domain;
pub mod http;
pub mod migrations;
pub mod repository;

pub use application::BillingApplication;
