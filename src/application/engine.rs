use crate::domain::order::{Order, OrderId, OrderLineItem, OrderStatus};
use crate::domain::ports::{
    AddressBookBox, ChargeOutcome, InventoryStoreBox, OrderRepositoryBox, PaymentGatewayBox,
    UserDirectoryBox,
};
use crate::domain::product::ProductId;
use crate::domain::user::{AddressId, UserId};
use crate::error::{OrderError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// The only currency the store sells in.
const CURRENCY: &str = "usd";

/// One product/quantity pair requested at order creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Outcome of a batch payment run. Each order's result is independent:
/// a decline for one order never blocks the others.
#[derive(Debug, Default)]
pub struct PaymentRun {
    pub paid: Vec<Order>,
    pub failures: Vec<(OrderId, OrderError)>,
}

/// The order lifecycle engine.
///
/// Owns the ports it orchestrates and holds no state of its own; all
/// shared mutable state lives behind the inventory store and the order
/// repository, whose atomic operations are the serialization points.
/// The engine never holds a store lock across a gateway call.
pub struct OrderEngine {
    inventory: InventoryStoreBox,
    orders: OrderRepositoryBox,
    users: UserDirectoryBox,
    addresses: AddressBookBox,
    gateway: PaymentGatewayBox,
}

impl OrderEngine {
    pub fn new(
        inventory: InventoryStoreBox,
        orders: OrderRepositoryBox,
        users: UserDirectoryBox,
        addresses: AddressBookBox,
        gateway: PaymentGatewayBox,
    ) -> Self {
        Self {
            inventory,
            orders,
            users,
            addresses,
            gateway,
        }
    }

    /// Creates a `Pending` order, reserving stock for every requested item.
    ///
    /// All-or-nothing: if any item fails validation or reservation, every
    /// reservation already made for this attempt is released before the
    /// error propagates.
    pub async fn create_order(&self, user_id: UserId, requests: &[ItemRequest]) -> Result<Order> {
        if !self.users.exists(user_id).await? {
            return Err(OrderError::UserNotFound(user_id));
        }
        if requests.is_empty() {
            return Err(OrderError::EmptyOrder);
        }

        let mut items = Vec::with_capacity(requests.len());
        let mut reserved: Vec<(ProductId, u32)> = Vec::with_capacity(requests.len());
        for request in requests {
            match self.reserve_line(request).await {
                Ok(item) => {
                    reserved.push((request.product_id, request.quantity));
                    items.push(item);
                }
                Err(err) => {
                    self.release_all(&reserved).await;
                    return Err(err);
                }
            }
        }

        let order = match self.orders.create(Order::new(user_id, items)).await {
            Ok(order) => order,
            Err(err) => {
                self.release_all(&reserved).await;
                return Err(err);
            }
        };

        debug!(order = %order.id, user = %user_id, total = %order.total, "order created");
        Ok(order)
    }

    /// Charges the order's total and transitions `Pending → Paid`.
    ///
    /// A decline or a transient gateway failure leaves the order `Pending`
    /// and surfaces unchanged; the engine never retries a charge on its
    /// own. Paying a non-`Pending` order is `InvalidState` and the gateway
    /// is not contacted at all.
    pub async fn process_payment(
        &self,
        order_id: OrderId,
        payment_method: &str,
        user_id: UserId,
    ) -> Result<Order> {
        let order = self.load_owned(order_id, user_id).await?;
        if order.status != OrderStatus::Pending {
            return Err(OrderError::InvalidState {
                order: order_id,
                action: "paid",
                status: order.status,
            });
        }

        let amount_minor = order
            .total
            .minor_units()
            .ok_or_else(|| OrderError::Internal("order total exceeds gateway range".into()))?;
        match self.gateway.charge(amount_minor, CURRENCY, payment_method).await? {
            ChargeOutcome::Succeeded => {}
            ChargeOutcome::Declined(reason) => {
                warn!(order = %order_id, %reason, "payment declined");
                return Err(OrderError::PaymentDeclined(reason));
            }
        }

        // Re-check the status inside the per-order critical section; a
        // racing cancellation may have won since the pre-check.
        let paid = self
            .orders
            .update(
                order_id,
                Box::new(move |order| {
                    if order.status != OrderStatus::Pending {
                        return Err(OrderError::InvalidState {
                            order: order_id,
                            action: "paid",
                            status: order.status,
                        });
                    }
                    order.status = OrderStatus::Paid;
                    Ok(())
                }),
            )
            .await?;

        debug!(order = %order_id, "payment captured");
        Ok(paid)
    }

    /// Pays every `Pending` order the user owns. Failures are collected
    /// per order, never fatal to the batch.
    pub async fn process_all_payments(
        &self,
        user_id: UserId,
        payment_method: &str,
    ) -> Result<PaymentRun> {
        if !self.users.exists(user_id).await? {
            return Err(OrderError::UserNotFound(user_id));
        }

        let mut run = PaymentRun::default();
        for order in self.orders.list_by_user(user_id).await? {
            if order.status != OrderStatus::Pending {
                continue;
            }
            match self.process_payment(order.id, payment_method, user_id).await {
                Ok(paid) => run.paid.push(paid),
                Err(err) => run.failures.push((order.id, err)),
            }
        }
        Ok(run)
    }

    /// Transitions `Paid → Shipped`, validating and attaching the shipping
    /// address when one is supplied.
    pub async fn initiate_shipping(
        &self,
        order_id: OrderId,
        user_id: UserId,
        address_id: Option<AddressId>,
    ) -> Result<Order> {
        let order = self.load_owned(order_id, user_id).await?;
        if order.status != OrderStatus::Paid {
            return Err(OrderError::InvalidState {
                order: order_id,
                action: "shipped",
                status: order.status,
            });
        }

        let shipping_address = match address_id {
            Some(address_id) => {
                let address = self
                    .addresses
                    .get(user_id, address_id)
                    .await?
                    .ok_or(OrderError::AddressNotFound(address_id))?;
                Some(address.id)
            }
            None => None,
        };

        self.orders
            .update(
                order_id,
                Box::new(move |order| {
                    if order.status != OrderStatus::Paid {
                        return Err(OrderError::InvalidState {
                            order: order_id,
                            action: "shipped",
                            status: order.status,
                        });
                    }
                    order.status = OrderStatus::Shipped;
                    if shipping_address.is_some() {
                        order.shipping_address = shipping_address;
                    }
                    Ok(())
                }),
            )
            .await
    }

    /// Transitions `Shipped → Delivered`. Terminal.
    pub async fn mark_as_delivered(&self, order_id: OrderId, user_id: UserId) -> Result<Order> {
        let order = self.load_owned(order_id, user_id).await?;
        if order.status != OrderStatus::Shipped {
            return Err(OrderError::InvalidState {
                order: order_id,
                action: "delivered",
                status: order.status,
            });
        }

        self.orders
            .update(
                order_id,
                Box::new(move |order| {
                    if order.status != OrderStatus::Shipped {
                        return Err(OrderError::InvalidState {
                            order: order_id,
                            action: "delivered",
                            status: order.status,
                        });
                    }
                    order.status = OrderStatus::Delivered;
                    Ok(())
                }),
            )
            .await
    }

    /// Cancels a `Pending` or `Paid` order and returns its reservations to
    /// stock. Cancelling twice reports `InvalidState` on the second call;
    /// only the caller that wins the transition releases inventory, so
    /// stock moves exactly once.
    pub async fn cancel_order(&self, order_id: OrderId, user_id: UserId) -> Result<Order> {
        self.load_owned(order_id, user_id).await?;

        let cancelled = self
            .orders
            .update(
                order_id,
                Box::new(move |order| {
                    if !order.status.can_cancel() {
                        return Err(OrderError::InvalidState {
                            order: order_id,
                            action: "cancelled",
                            status: order.status,
                        });
                    }
                    order.status = OrderStatus::Cancelled;
                    Ok(())
                }),
            )
            .await?;

        let reserved: Vec<_> = cancelled
            .items
            .iter()
            .map(|item| (item.product_id, item.quantity))
            .collect();
        self.release_all(&reserved).await;

        debug!(order = %order_id, "order cancelled");
        Ok(cancelled)
    }

    /// Hard delete: restores inventory for every line item regardless of
    /// status and removes the order record. The delete is the atomic step;
    /// the caller that wins it performs the restoration.
    pub async fn remove_order(&self, user_id: UserId, order_id: OrderId) -> Result<Order> {
        self.load_owned(order_id, user_id).await?;

        let removed = self.orders.delete(order_id).await?;
        let reserved: Vec<_> = removed
            .items
            .iter()
            .map(|item| (item.product_id, item.quantity))
            .collect();
        self.release_all(&reserved).await;

        debug!(order = %order_id, "order removed");
        Ok(removed)
    }

    /// Shipping-and-delivery workflow with compensation: when the shipping
    /// step fails on state or address validation, the order is cancelled
    /// (restoring stock) and the original error is surfaced wrapped as
    /// `DeliveryFailed`. Missing or foreign orders propagate unwrapped.
    pub async fn ship_and_deliver(
        &self,
        order_id: OrderId,
        user_id: UserId,
        address_id: Option<AddressId>,
    ) -> Result<Order> {
        match self.initiate_shipping(order_id, user_id, address_id).await {
            Ok(_) => self.mark_as_delivered(order_id, user_id).await,
            Err(err @ (OrderError::InvalidState { .. } | OrderError::AddressNotFound(_))) => {
                warn!(order = %order_id, %err, "shipping failed, cancelling order");
                if let Err(cancel_err) = self.cancel_order(order_id, user_id).await {
                    warn!(order = %order_id, %cancel_err, "compensating cancellation failed");
                }
                Err(OrderError::DeliveryFailed(Box::new(err)))
            }
            Err(err) => Err(err),
        }
    }

    async fn reserve_line(&self, request: &ItemRequest) -> Result<OrderLineItem> {
        let product = self
            .inventory
            .get(request.product_id)
            .await?
            .ok_or(OrderError::ProductNotFound(request.product_id))?;
        if request.quantity == 0 {
            return Err(OrderError::InvalidQuantity(request.product_id));
        }
        self.inventory
            .reserve(request.product_id, request.quantity)
            .await?;
        Ok(OrderLineItem::new(&product, request.quantity))
    }

    /// Rollback path. Release only fails if the product vanished, which
    /// the catalog contract rules out; failures are logged, not raised.
    async fn release_all(&self, reserved: &[(ProductId, u32)]) {
        for &(product_id, quantity) in reserved {
            if let Err(err) = self.inventory.release(product_id, quantity).await {
                warn!(product = %product_id, %err, "failed to release reservation");
            }
        }
    }

    async fn load_owned(&self, order_id: OrderId, user_id: UserId) -> Result<Order> {
        let order = self
            .orders
            .get(order_id)
            .await?
            .ok_or(OrderError::OrderNotFound(order_id))?;
        if !order.is_owned_by(user_id) {
            return Err(OrderError::Unauthorized {
                order: order_id,
                user: user_id,
            });
        }
        Ok(order)
    }
}
