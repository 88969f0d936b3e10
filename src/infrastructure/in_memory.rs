use crate::domain::order::{Order, OrderId};
use crate::domain::ports::{
    AddressBook, InventoryStore, OrderMutation, OrderRepository, UserDirectory,
};
use crate::domain::product::{Product, ProductId};
use crate::domain::user::{Address, AddressId, User, UserId};
use crate::error::{OrderError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock};

/// Thread-safe in-memory inventory with one lock per product.
///
/// The outer map lock is held only long enough to find the entry; the
/// conditional decrement itself serializes on the product's own mutex, so
/// reservations for different products never contend.
#[derive(Default, Clone)]
pub struct InMemoryInventory {
    products: Arc<RwLock<HashMap<ProductId, Arc<Mutex<Product>>>>>,
}

impl InMemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }

    async fn entry(&self, product_id: ProductId) -> Result<Arc<Mutex<Product>>> {
        let products = self.products.read().await;
        products
            .get(&product_id)
            .cloned()
            .ok_or(OrderError::ProductNotFound(product_id))
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventory {
    async fn insert(&self, product: Product) -> Result<()> {
        let mut products = self.products.write().await;
        products.insert(product.id, Arc::new(Mutex::new(product)));
        Ok(())
    }

    async fn get(&self, product_id: ProductId) -> Result<Option<Product>> {
        let slot = { self.products.read().await.get(&product_id).cloned() };
        match slot {
            Some(slot) => Ok(Some(slot.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<Product>> {
        let slots: Vec<_> = { self.products.read().await.values().cloned().collect() };
        let mut products = Vec::with_capacity(slots.len());
        for slot in slots {
            products.push(slot.lock().await.clone());
        }
        products.sort_by_key(|product| product.id);
        Ok(products)
    }

    async fn reserve(&self, product_id: ProductId, quantity: u32) -> Result<()> {
        let slot = self.entry(product_id).await?;
        let mut product = slot.lock().await;
        if product.quantity < quantity {
            return Err(OrderError::InsufficientStock {
                product: product_id,
                name: product.name.clone(),
                requested: quantity,
                available: product.quantity,
            });
        }
        product.quantity -= quantity;
        Ok(())
    }

    async fn release(&self, product_id: ProductId, quantity: u32) -> Result<()> {
        let slot = self.entry(product_id).await?;
        let mut product = slot.lock().await;
        product.quantity += quantity;
        Ok(())
    }
}

/// Thread-safe in-memory order repository with one lock per order.
///
/// `update` runs the mutation while the order's mutex is held, which is
/// the per-order serialization point the engine relies on.
#[derive(Default, Clone)]
pub struct InMemoryOrderRepository {
    orders: Arc<RwLock<HashMap<OrderId, Arc<Mutex<Order>>>>>,
    next_id: Arc<AtomicU64>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, order_id: OrderId) -> Result<Arc<Mutex<Order>>> {
        let orders = self.orders.read().await;
        orders
            .get(&order_id)
            .cloned()
            .ok_or(OrderError::OrderNotFound(order_id))
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn create(&self, mut order: Order) -> Result<Order> {
        let id = OrderId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        order.id = id;
        let mut orders = self.orders.write().await;
        orders.insert(id, Arc::new(Mutex::new(order.clone())));
        Ok(order)
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>> {
        let slot = { self.orders.read().await.get(&order_id).cloned() };
        match slot {
            Some(slot) => Ok(Some(slot.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn save(&self, order: Order) -> Result<Order> {
        let slot = self.slot(order.id).await?;
        let mut stored = slot.lock().await;
        *stored = order.clone();
        Ok(order)
    }

    async fn update(&self, order_id: OrderId, mutation: OrderMutation) -> Result<Order> {
        let slot = self.slot(order_id).await?;
        let mut order = slot.lock().await;
        mutation(&mut order)?;
        Ok(order.clone())
    }

    async fn list(&self) -> Result<Vec<Order>> {
        let slots: Vec<_> = { self.orders.read().await.values().cloned().collect() };
        let mut orders = Vec::with_capacity(slots.len());
        for slot in slots {
            orders.push(slot.lock().await.clone());
        }
        orders.sort_by_key(|order| order.id);
        Ok(orders)
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let slots: Vec<_> = { self.orders.read().await.values().cloned().collect() };
        let mut orders = Vec::new();
        for slot in slots {
            let order = slot.lock().await;
            if order.user_id == user_id {
                orders.push(order.clone());
            }
        }
        orders.sort_by_key(|order| order.id);
        Ok(orders)
    }

    async fn delete(&self, order_id: OrderId) -> Result<Order> {
        let slot = { self.orders.write().await.remove(&order_id) }
            .ok_or(OrderError::OrderNotFound(order_id))?;
        let order = slot.lock().await.clone();
        Ok(order)
    }
}

/// In-memory stand-in for the identity provider's user records.
#[derive(Default, Clone)]
pub struct InMemoryUserDirectory {
    users: Arc<RwLock<HashMap<UserId, User>>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, user: User) {
        let mut users = self.users.write().await;
        users.insert(user.id, user);
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn exists(&self, user_id: UserId) -> Result<bool> {
        let users = self.users.read().await;
        Ok(users.contains_key(&user_id))
    }

    async fn get(&self, user_id: UserId) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(&user_id).cloned())
    }
}

/// In-memory address book keyed by address id; lookups check ownership.
#[derive(Default, Clone)]
pub struct InMemoryAddressBook {
    addresses: Arc<RwLock<HashMap<AddressId, Address>>>,
}

impl InMemoryAddressBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, address: Address) {
        let mut addresses = self.addresses.write().await;
        addresses.insert(address.id, address);
    }
}

#[async_trait]
impl AddressBook for InMemoryAddressBook {
    async fn get(&self, user_id: UserId, address_id: AddressId) -> Result<Option<Address>> {
        let addresses = self.addresses.read().await;
        Ok(addresses
            .get(&address_id)
            .filter(|address| address.user_id == user_id)
            .cloned())
    }
}
