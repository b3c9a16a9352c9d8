//! The order aggregate and its line items (spec §4.1), ported from
//! `order-service/core/order.go` and `core/items.go`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::state_machine::OrderStatus;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub status: OrderStatus,
    pub total: Decimal,
    pub warehouse_confirmed: bool,
    pub delivery_confirmed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

impl Order {
    /// Both participants have confirmed their reservation; the saga
    /// controller can move the order to `Confirmed`.
    pub fn both_confirmed(&self) -> bool {
        self.warehouse_confirmed && self.delivery_confirmed
    }
}
