use crate::domain::money::Money;
use crate::domain::product::{Product, ProductId};
use crate::domain::user::{AddressId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Order lifecycle. `Delivered` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Cancellation is only reachable before shipment.
    pub fn can_cancel(&self) -> bool {
        matches!(self, Self::Pending | Self::Paid)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        })
    }
}

/// One order line with the product's name and price frozen at creation
/// time, so later catalog edits never change what the customer agreed to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub product_name: String,
    pub unit_price: Money,
    pub subtotal: Money,
}

impl OrderLineItem {
    /// Snapshots the product's current name and price.
    pub fn new(product: &Product, quantity: u32) -> Self {
        Self {
            product_id: product.id,
            quantity,
            product_name: product.name.clone(),
            unit_price: product.price,
            subtotal: product.price.times(quantity),
        }
    }
}

/// The order aggregate. Owns its line items by value; the repository is
/// the only writer path and persists the whole aggregate as one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub status: OrderStatus,
    pub items: Vec<OrderLineItem>,
    pub total: Money,
    pub shipping_address: Option<AddressId>,
}

impl Order {
    /// Builds a `Pending` order from already-reserved line items. The id is
    /// assigned by the repository on create.
    pub fn new(user_id: UserId, items: Vec<OrderLineItem>) -> Self {
        let mut order = Self {
            id: OrderId(0),
            user_id,
            created_at: Utc::now(),
            status: OrderStatus::Pending,
            items,
            total: Money::ZERO,
            shipping_address: None,
        };
        order.recalculate_total();
        order
    }

    /// Invariant: `total == sum(item.subtotal)`. Called whenever the line
    /// items change.
    pub fn recalculate_total(&mut self) {
        self.total = self.items.iter().map(|item| item.subtotal).sum();
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn widget() -> Product {
        Product::new(ProductId(1), "Widget", Money::new(dec!(10.00)), 5)
    }

    fn gadget() -> Product {
        Product::new(ProductId(2), "Gadget", Money::new(dec!(5.00)), 5)
    }

    #[test]
    fn test_line_item_snapshots_product() {
        let item = OrderLineItem::new(&widget(), 2);
        assert_eq!(item.product_name, "Widget");
        assert_eq!(item.unit_price, Money::new(dec!(10.00)));
        assert_eq!(item.subtotal, Money::new(dec!(20.00)));
    }

    #[test]
    fn test_order_total_is_sum_of_subtotals() {
        let order = Order::new(
            UserId(1),
            vec![
                OrderLineItem::new(&widget(), 2),
                OrderLineItem::new(&gadget(), 3),
            ],
        );
        assert_eq!(order.total, Money::new(dec!(35.00)));
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[test]
    fn test_snapshot_survives_catalog_edit() {
        let mut product = widget();
        let item = OrderLineItem::new(&product, 1);
        product.price = Money::new(dec!(99.00));
        product.name = "Renamed".into();
        assert_eq!(item.unit_price, Money::new(dec!(10.00)));
        assert_eq!(item.product_name, "Widget");
    }

    #[test]
    fn test_status_predicates() {
        assert!(OrderStatus::Pending.can_cancel());
        assert!(OrderStatus::Paid.can_cancel());
        assert!(!OrderStatus::Shipped.can_cancel());
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Paid.is_terminal());
    }
}
