//! Account ledger and bill lifecycle, ported from
//! `billing-service/core/account.go` / `billing/bill.go`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub user_id: i64,
    pub balance: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum BillStatus {
    Created,
    Completed,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Bill {
    pub id: i64,
    pub account_id: i64,
    pub order_id: i64,
    pub status: BillStatus,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}
