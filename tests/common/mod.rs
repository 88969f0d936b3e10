use orderflow::application::engine::{ItemRequest, OrderEngine};
use orderflow::domain::money::Money;
use orderflow::domain::product::{Product, ProductId};
use orderflow::domain::user::{User, UserId};
use orderflow::domain::ports::InventoryStore;
use orderflow::infrastructure::gateway::ScriptedGateway;
use orderflow::infrastructure::in_memory::{
    InMemoryAddressBook, InMemoryInventory, InMemoryOrderRepository, InMemoryUserDirectory,
};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Engine wired to in-memory stores, with handles kept so tests can seed
/// data and assert on store state directly.
pub struct Harness {
    pub engine: Arc<OrderEngine>,
    pub inventory: InMemoryInventory,
    pub orders: InMemoryOrderRepository,
    pub users: InMemoryUserDirectory,
    pub addresses: InMemoryAddressBook,
    pub gateway: ScriptedGateway,
}

pub fn harness() -> Harness {
    let inventory = InMemoryInventory::new();
    let orders = InMemoryOrderRepository::new();
    let users = InMemoryUserDirectory::new();
    let addresses = InMemoryAddressBook::new();
    let gateway = ScriptedGateway::new();

    let engine = Arc::new(OrderEngine::new(
        Box::new(inventory.clone()),
        Box::new(orders.clone()),
        Box::new(users.clone()),
        Box::new(addresses.clone()),
        Box::new(gateway.clone()),
    ));

    Harness {
        engine,
        inventory,
        orders,
        users,
        addresses,
        gateway,
    }
}

pub async fn seed_user(h: &Harness, id: u64) -> UserId {
    let user_id = UserId(id);
    h.users
        .insert(User {
            id: user_id,
            name: format!("user-{id}"),
        })
        .await;
    user_id
}

pub async fn seed_product(
    h: &Harness,
    id: u64,
    name: &str,
    price: Decimal,
    quantity: u32,
) -> ProductId {
    let product_id = ProductId(id);
    h.inventory
        .insert(Product::new(product_id, name, Money::new(price), quantity))
        .await
        .unwrap();
    product_id
}

pub fn request(product_id: ProductId, quantity: u32) -> ItemRequest {
    ItemRequest {
        product_id,
        quantity,
    }
}
