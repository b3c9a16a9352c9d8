//! Unit price resolution, deliberately pulled out of the saga transaction
//! (spec §9 REDESIGN FLAGS: the original `PriceService.GetPrice` made a
//! synchronous HTTP call to the pricing service from inside
//! `modifyItemsQuantity`'s open DB transaction — here the lookup always
//! happens before a transaction is opened).
//!
//! The product-pricing service is out of scope for this implementation
//! (see DESIGN.md), so the only provided implementation is a static table
//! rather than an HTTP client; the trait boundary is what matters; a real
//! deployment would swap in an HTTP-backed resolver without touching the
//! saga controller.

use async_trait::async_trait;
use rust_decimal::Decimal;

use rc_common::Result;

#[async_trait]
pub trait PriceResolver: Send + Sync {
    /// Resolve the unit price to charge for `quantity` units of
    /// `product_id`. Returns the effective (post-discount) unit price; the
    /// saga multiplies by quantity itself.
    async fn resolve(&self, product_id: i64, quantity: i64) -> Result<Decimal>;
}

/// Fixed per-product price table, standing in for the pricing service this
/// repo doesn't implement. Unknown products resolve to a flat default
/// rather than failing the whole add-items command.
pub struct StaticPriceResolver {
    default_price: Decimal,
}

impl StaticPriceResolver {
    pub fn new(default_price: Decimal) -> Self {
        Self { default_price }
    }
}

impl Default for StaticPriceResolver {
    fn default() -> Self {
        Self::new(Decimal::new(999, 2))
    }
}

#[async_trait]
impl PriceResolver for StaticPriceResolver {
    async fn resolve(&self, _product_id: i64, _quantity: i64) -> Result<Decimal> {
        Ok(self.default_price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_resolver_returns_its_configured_price() {
        let resolver = StaticPriceResolver::new(Decimal::new(1500, 2));
        let price = resolver.resolve(42, 3).await.unwrap();
        assert_eq!(price, Decimal::new(1500, 2));
    }
}
