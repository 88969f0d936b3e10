use crate::domain::money::Money;
use crate::error::{OrderError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub u64);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Catalog entry. `quantity` is the stock currently available for
/// reservation and is mutated only through the inventory store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub quantity: u32,
    pub description: Option<String>,
}

impl Product {
    pub fn new(id: ProductId, name: impl Into<String>, price: Money, quantity: u32) -> Self {
        Self {
            id,
            name: name.into(),
            price,
            quantity,
            description: None,
        }
    }

    /// Seed-time validation: a product needs a name and a positive price.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(OrderError::Validation("product name is required".into()));
        }
        if !self.price.is_positive() {
            return Err(OrderError::Validation("price must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_validate_accepts_well_formed_product() {
        let product = Product::new(ProductId(1), "Widget", Money::new(dec!(10.00)), 5);
        assert!(product.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_name() {
        let product = Product::new(ProductId(1), "  ", Money::new(dec!(10.00)), 5);
        assert!(matches!(
            product.validate(),
            Err(OrderError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_rejects_non_positive_price() {
        let product = Product::new(ProductId(1), "Widget", Money::new(dec!(0.00)), 5);
        assert!(matches!(
            product.validate(),
            Err(OrderError::Validation(_))
        ));
    }
}
