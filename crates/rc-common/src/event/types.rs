//! The event taxonomy (spec §4.9): every event type that flows across the
//! bus, grouped by topic. Expressed as one closed Rust enum per topic rather
//! than the original's runtime type-introspection dispatch table — see
//! `marshaller.rs` for the static dispatch this replaces.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An item line as it travels inside order/warehouse/delivery events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventItem {
    pub product_id: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "@type", content = "@data")]
pub enum OrderEvent {
    #[serde(rename = "orderCreated")]
    OrderCreated { order_id: i64, user_id: i64 },

    #[serde(rename = "orderItemsAdded")]
    OrderItemsAdded { order_id: i64, user_id: i64, items: Vec<EventItem> },

    #[serde(rename = "orderItemsRemoved")]
    OrderItemsRemoved { order_id: i64, user_id: i64, items: Vec<EventItem> },

    #[serde(rename = "orderPrepared")]
    OrderPrepared {
        order_id: i64,
        user_id: i64,
        total: Decimal,
        items: Vec<EventItem>,
    },

    #[serde(rename = "orderConfirmed")]
    OrderConfirmed {
        order_id: i64,
        user_id: i64,
        total: Decimal,
        items: Vec<EventItem>,
    },

    #[serde(rename = "orderRejected")]
    OrderRejected { order_id: i64, user_id: i64, items: Vec<EventItem> },

    #[serde(rename = "orderRolledBack")]
    OrderRolledBack {
        order_id: i64,
        user_id: i64,
        total: Decimal,
        items: Vec<EventItem>,
    },

    #[serde(rename = "orderCompleted")]
    OrderCompleted {
        order_id: i64,
        user_id: i64,
        total: Decimal,
        items: Vec<EventItem>,
    },
}

impl OrderEvent {
    pub fn order_id(&self) -> i64 {
        match self {
            OrderEvent::OrderCreated { order_id, .. }
            | OrderEvent::OrderItemsAdded { order_id, .. }
            | OrderEvent::OrderItemsRemoved { order_id, .. }
            | OrderEvent::OrderPrepared { order_id, .. }
            | OrderEvent::OrderConfirmed { order_id, .. }
            | OrderEvent::OrderRejected { order_id, .. }
            | OrderEvent::OrderRolledBack { order_id, .. }
            | OrderEvent::OrderCompleted { order_id, .. } => *order_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "@type", content = "@data")]
pub enum BillingEvent {
    #[serde(rename = "moneyAdded")]
    MoneyAdded { user_id: i64, money_added: Decimal },

    #[serde(rename = "paymentCompleted")]
    PaymentCompleted { bill_id: i64, order_id: i64, account_id: i64 },

    #[serde(rename = "paymentRejected")]
    PaymentRejected { order_id: i64, reason: String },
}

impl BillingEvent {
    pub fn order_id(&self) -> Option<i64> {
        match self {
            BillingEvent::MoneyAdded { .. } => None,
            BillingEvent::PaymentCompleted { order_id, .. } => Some(*order_id),
            BillingEvent::PaymentRejected { order_id, .. } => Some(*order_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "@type", content = "@data")]
pub enum WarehouseEvent {
    #[serde(rename = "orderWarehouseConfirmed")]
    OrderWarehouseConfirmed { order_id: i64 },

    #[serde(rename = "orderWarehouseRejected")]
    OrderWarehouseRejected { order_id: i64, reason: String },

    #[serde(rename = "productsBatchQuantityChanged")]
    ProductsBatchQuantityChanged { changes: Vec<ProductQuantityChange> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductQuantityChange {
    pub product_id: i64,
    pub quantity: i64,
    pub increase: bool,
}

impl WarehouseEvent {
    pub fn order_id(&self) -> Option<i64> {
        match self {
            WarehouseEvent::OrderWarehouseConfirmed { order_id } => Some(*order_id),
            WarehouseEvent::OrderWarehouseRejected { order_id, .. } => Some(*order_id),
            WarehouseEvent::ProductsBatchQuantityChanged { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "@type", content = "@data")]
pub enum DeliveryEvent {
    #[serde(rename = "orderDeliveryConfirmed")]
    OrderDeliveryConfirmed { order_id: i64 },

    #[serde(rename = "orderDeliveryRejected")]
    OrderDeliveryRejected { order_id: i64, reason: String },
}

impl DeliveryEvent {
    pub fn order_id(&self) -> i64 {
        match self {
            DeliveryEvent::OrderDeliveryConfirmed { order_id } => *order_id,
            DeliveryEvent::OrderDeliveryRejected { order_id, .. } => *order_id,
        }
    }
}

/// Taxonomy constants declared for completeness (spec §4.9) but with no
/// producer or consumer in this repo — `product.events` and `user.events`
/// belong to the out-of-scope product/user services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "@type", content = "@data")]
pub enum ProductEvent {
    #[serde(rename = "productChanged")]
    ProductChanged { product_id: i64 },
    #[serde(rename = "productArchived")]
    ProductArchived { product_id: i64 },
    #[serde(rename = "productPriceChanged")]
    ProductPriceChanged { product_id: i64, price: Decimal },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "@type", content = "@data")]
pub enum UserEvent {
    #[serde(rename = "userCreated")]
    UserCreated { user_id: i64 },
    #[serde(rename = "userProfileChanged")]
    UserProfileChanged { user_id: i64 },
    #[serde(rename = "userChangePassword")]
    UserChangePassword { user_id: i64 },
}

/// Topic name constants, per spec §4.9.
pub mod topics {
    pub const ORDER_EVENTS: &str = "order.events";
    pub const BILLING_EVENTS: &str = "billing.events";
    pub const WAREHOUSE_EVENTS: &str = "warehouse.events";
    pub const DELIVERY_EVENTS: &str = "delivery.events";
    pub const PRODUCT_EVENTS: &str = "product.events";
    pub const USER_EVENTS: &str = "user.events";
}
