//! Delivery/courier assignment, ported from
//! `delivery-service/core/delivery.go`'s `Delivery` and its `courier`
//! table.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Delivery {
    pub order_id: i64,
    pub address: String,
    pub date: NaiveDate,
    pub courier_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, sqlx::FromRow, Serialize, Deserialize)]
pub struct Courier {
    pub courier_id: i64,
    pub max_per_day: i32,
}
