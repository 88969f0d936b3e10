use crate::domain::order::{Order, OrderId};
use crate::domain::product::{Product, ProductId};
use crate::domain::user::{Address, AddressId, User, UserId};
use crate::error::Result;
use async_trait::async_trait;

/// Mutation applied inside the repository's per-order critical section.
/// The closure is synchronous on purpose: nothing may suspend while the
/// order's serialization point is held.
pub type OrderMutation = Box<dyn FnOnce(&mut Order) -> Result<()> + Send>;

/// Per-product stock, with atomic conditional decrement. Concurrent
/// `reserve` calls for the same product serialize; the sum of successful
/// reservations never exceeds the quantity that was available.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn insert(&self, product: Product) -> Result<()>;
    async fn get(&self, product_id: ProductId) -> Result<Option<Product>>;
    async fn list(&self) -> Result<Vec<Product>>;
    /// Decrements stock only if `quantity` is still available, as one
    /// indivisible step. Errors: `ProductNotFound`, `InsufficientStock`.
    async fn reserve(&self, product_id: ProductId, quantity: u32) -> Result<()>;
    /// Unconditionally returns `quantity` to stock.
    async fn release(&self, product_id: ProductId, quantity: u32) -> Result<()>;
}

/// Durable storage of order aggregates. All operations on a single order
/// are atomic with respect to each other; business invariants stay with
/// the engine.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Assigns an id and persists the order and its line items as one unit.
    async fn create(&self, order: Order) -> Result<Order>;
    async fn get(&self, order_id: OrderId) -> Result<Option<Order>>;
    /// Full overwrite of the order's mutable fields.
    async fn save(&self, order: Order) -> Result<Order>;
    /// Runs `mutation` inside the order's serialization point and returns
    /// the mutated order. Engine check-then-act belongs in the closure.
    async fn update(&self, order_id: OrderId, mutation: OrderMutation) -> Result<Order>;
    async fn list(&self) -> Result<Vec<Order>>;
    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Order>>;
    /// Removes and returns the order, so that exactly one caller observes
    /// the removed state. Errors with `OrderNotFound` for the rest.
    async fn delete(&self, order_id: OrderId) -> Result<Order>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChargeOutcome {
    Succeeded,
    Declined(String),
}

/// External payment processor. Transient transport failures come back as
/// `Err(GatewayUnavailable)`; a decline is a successful round trip with a
/// negative answer.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge(
        &self,
        amount_minor: i64,
        currency: &str,
        payment_method: &str,
    ) -> Result<ChargeOutcome>;
}

/// Read-only view of the identity provider's user records.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn exists(&self, user_id: UserId) -> Result<bool>;
    async fn get(&self, user_id: UserId) -> Result<Option<User>>;
}

#[async_trait]
pub trait AddressBook: Send + Sync {
    /// `None` when the address is missing or belongs to another user.
    async fn get(&self, user_id: UserId, address_id: AddressId) -> Result<Option<Address>>;
}

pub type InventoryStoreBox = Box<dyn InventoryStore>;
pub type OrderRepositoryBox = Box<dyn OrderRepository>;
pub type PaymentGatewayBox = Box<dyn PaymentGateway>;
pub type UserDirectoryBox = Box<dyn UserDirectory>;
pub type AddressBookBox = Box<dyn AddressBook>;
