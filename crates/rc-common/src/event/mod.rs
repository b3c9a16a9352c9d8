pub mod envelope;
pub mod marshaller;
pub mod types;

pub use envelope::{Envelope, RawEnvelope};
pub use types::{
    topics, BillingEvent, DeliveryEvent, EventItem, OrderEvent, ProductEvent, ProductQuantityChange,
    UserEvent, WarehouseEvent,
};
