use crate::domain::order::{OrderId, OrderStatus};
use crate::domain::product::ProductId;
use crate::domain::user::{AddressId, UserId};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, OrderError>;

/// Failure taxonomy for the order lifecycle engine.
///
/// Validation and state errors surface to the immediate caller unchanged.
/// Gateway outcomes keep declines and transient transport failures apart so
/// callers can decide whether a retry is safe.
#[derive(Error, Debug)]
pub enum OrderError {
    #[error("user not found: {0}")]
    UserNotFound(UserId),
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),
    #[error("address not found: {0}")]
    AddressNotFound(AddressId),
    #[error("order {order} does not belong to user: {user}")]
    Unauthorized { order: OrderId, user: UserId },
    #[error("order {order} cannot be {action} while {status}")]
    InvalidState {
        order: OrderId,
        action: &'static str,
        status: OrderStatus,
    },
    #[error("insufficient stock for {name}: requested {requested}, available {available}")]
    InsufficientStock {
        product: ProductId,
        name: String,
        requested: u32,
        available: u32,
    },
    #[error("quantity must be positive for product: {0}")]
    InvalidQuantity(ProductId),
    #[error("order must have at least one item")]
    EmptyOrder,
    #[error("payment declined: {0}")]
    PaymentDeclined(String),
    #[error("payment gateway unavailable: {0}")]
    GatewayUnavailable(String),
    #[error("delivery failed, order cancelled: {0}")]
    DeliveryFailed(#[source] Box<OrderError>),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("storage error: {0}")]
    Storage(#[from] rocksdb::Error),
    #[error("internal error: {0}")]
    Internal(Box<dyn std::error::Error + Send + Sync>),
}
