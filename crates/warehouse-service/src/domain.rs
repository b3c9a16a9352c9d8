//! Stock ledger, ported from `warehouse-service/core/warehouse.go`'s
//! `StoreItem` and `processed_orders` idempotence table.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow, Serialize, Deserialize)]
pub struct StoreItem {
    pub product_id: i64,
    pub available_quantity: i64,
}
