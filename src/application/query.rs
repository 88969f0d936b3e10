use crate::domain::money::Money;
use crate::domain::order::Order;
use crate::domain::ports::{OrderRepositoryBox, UserDirectoryBox};
use crate::domain::user::UserId;
use crate::error::{OrderError, Result};

/// A user's orders with the running total across all of them.
#[derive(Debug)]
pub struct OrdersSummary {
    pub orders: Vec<Order>,
    pub total_of_all_orders: Money,
}

/// Read-only aggregation over the order repository. No side effects; each
/// order is read as a repository-atomic snapshot.
pub struct OrderQueryService {
    orders: OrderRepositoryBox,
    users: UserDirectoryBox,
}

impl OrderQueryService {
    pub fn new(orders: OrderRepositoryBox, users: UserDirectoryBox) -> Self {
        Self { orders, users }
    }

    pub async fn orders_for_user(&self, user_id: UserId) -> Result<OrdersSummary> {
        if !self.users.exists(user_id).await? {
            return Err(OrderError::UserNotFound(user_id));
        }
        let orders = self.orders.list_by_user(user_id).await?;
        let total_of_all_orders = orders.iter().map(|order| order.total).sum();
        Ok(OrdersSummary {
            orders,
            total_of_all_orders,
        })
    }
}
