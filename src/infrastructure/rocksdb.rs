use crate::domain::order::{Order, OrderId};
use crate::domain::ports::{InventoryStore, OrderMutation, OrderRepository};
use crate::domain::product::{Product, ProductId};
use crate::domain::user::UserId;
use crate::error::{OrderError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for the product catalog and its stock counts.
pub const CF_PRODUCTS: &str = "products";
/// Column Family for order aggregates (order + line items as one value).
pub const CF_ORDERS: &str = "orders";
/// Column Family for bookkeeping such as the order id counter.
pub const CF_META: &str = "meta";

const NEXT_ORDER_ID_KEY: &[u8] = b"next_order_id";

/// One async mutex per entity key. RocksDB gives durable point writes but
/// no conditional update, so reserve/release/update take the key's lock
/// around their read-modify-write.
#[derive(Default, Clone)]
struct KeyLocks {
    locks: Arc<Mutex<HashMap<u64, Arc<Mutex<()>>>>>,
}

impl KeyLocks {
    async fn acquire(&self, key: u64) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(key).or_default().clone()
    }
}

/// A persistent store implementation using RocksDB.
///
/// Implements both the inventory store and the order repository over one
/// database, keeping the per-product and per-order atomicity guarantees
/// via key-level locks. `Clone` shares the underlying `Arc<DB>`.
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    product_locks: KeyLocks,
    order_locks: KeyLocks,
    id_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, ensuring
    /// the required column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_products = ColumnFamilyDescriptor::new(CF_PRODUCTS, Options::default());
        let cf_orders = ColumnFamilyDescriptor::new(CF_ORDERS, Options::default());
        let cf_meta = ColumnFamilyDescriptor::new(CF_META, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_products, cf_orders, cf_meta])?;

        Ok(Self {
            db: Arc::new(db),
            product_locks: KeyLocks::default(),
            order_locks: KeyLocks::default(),
            id_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| OrderError::Internal(format!("{name} column family not found").into()))
    }

    fn read_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        let cf = self.cf(CF_PRODUCTS)?;
        match self.db.get_cf(cf, product_id.0.to_be_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write_product(&self, product: &Product) -> Result<()> {
        let cf = self.cf(CF_PRODUCTS)?;
        self.db
            .put_cf(cf, product.id.0.to_be_bytes(), encode(product)?)?;
        Ok(())
    }

    fn read_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let cf = self.cf(CF_ORDERS)?;
        match self.db.get_cf(cf, order_id.0.to_be_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write_order(&self, order: &Order) -> Result<()> {
        let cf = self.cf(CF_ORDERS)?;
        self.db.put_cf(cf, order.id.0.to_be_bytes(), encode(order)?)?;
        Ok(())
    }

    fn next_order_id(&self) -> Result<OrderId> {
        let cf = self.cf(CF_META)?;
        let next = match self.db.get_cf(cf, NEXT_ORDER_ID_KEY)? {
            Some(bytes) => u64::from_be_bytes(
                bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| OrderError::Internal("corrupt order id counter".into()))?,
            ),
            None => 1,
        };
        self.db
            .put_cf(cf, NEXT_ORDER_ID_KEY, (next + 1).to_be_bytes())?;
        Ok(OrderId(next))
    }
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| OrderError::Internal(Box::new(e)))
}

fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| OrderError::Internal(Box::new(e)))
}

#[async_trait]
impl InventoryStore for RocksDBStore {
    async fn insert(&self, product: Product) -> Result<()> {
        let lock = self.product_locks.acquire(product.id.0).await;
        let _guard = lock.lock().await;
        self.write_product(&product)
    }

    async fn get(&self, product_id: ProductId) -> Result<Option<Product>> {
        self.read_product(product_id)
    }

    async fn list(&self) -> Result<Vec<Product>> {
        let cf = self.cf(CF_PRODUCTS)?;
        let mut products = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = item?;
            products.push(decode::<Product>(&value)?);
        }
        products.sort_by_key(|product| product.id);
        Ok(products)
    }

    async fn reserve(&self, product_id: ProductId, quantity: u32) -> Result<()> {
        let lock = self.product_locks.acquire(product_id.0).await;
        let _guard = lock.lock().await;

        let mut product = self
            .read_product(product_id)?
            .ok_or(OrderError::ProductNotFound(product_id))?;
        if product.quantity < quantity {
            return Err(OrderError::InsufficientStock {
                product: product_id,
                name: product.name,
                requested: quantity,
                available: product.quantity,
            });
        }
        product.quantity -= quantity;
        self.write_product(&product)
    }

    async fn release(&self, product_id: ProductId, quantity: u32) -> Result<()> {
        let lock = self.product_locks.acquire(product_id.0).await;
        let _guard = lock.lock().await;

        let mut product = self
            .read_product(product_id)?
            .ok_or(OrderError::ProductNotFound(product_id))?;
        product.quantity += quantity;
        self.write_product(&product)
    }
}

#[async_trait]
impl OrderRepository for RocksDBStore {
    async fn create(&self, mut order: Order) -> Result<Order> {
        let _guard = self.id_lock.lock().await;
        order.id = self.next_order_id()?;
        self.write_order(&order)?;
        Ok(order)
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>> {
        self.read_order(order_id)
    }

    async fn save(&self, order: Order) -> Result<Order> {
        let lock = self.order_locks.acquire(order.id.0).await;
        let _guard = lock.lock().await;

        if self.read_order(order.id)?.is_none() {
            return Err(OrderError::OrderNotFound(order.id));
        }
        self.write_order(&order)?;
        Ok(order)
    }

    async fn update(&self, order_id: OrderId, mutation: OrderMutation) -> Result<Order> {
        let lock = self.order_locks.acquire(order_id.0).await;
        let _guard = lock.lock().await;

        let mut order = self
            .read_order(order_id)?
            .ok_or(OrderError::OrderNotFound(order_id))?;
        mutation(&mut order)?;
        self.write_order(&order)?;
        Ok(order)
    }

    async fn list(&self) -> Result<Vec<Order>> {
        let cf = self.cf(CF_ORDERS)?;
        let mut orders = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = item?;
            orders.push(decode::<Order>(&value)?);
        }
        orders.sort_by_key(|order| order.id);
        Ok(orders)
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let mut orders = self.list().await?;
        orders.retain(|order| order.user_id == user_id);
        Ok(orders)
    }

    async fn delete(&self, order_id: OrderId) -> Result<Order> {
        let lock = self.order_locks.acquire(order_id.0).await;
        let _guard = lock.lock().await;

        let order = self
            .read_order(order_id)?
            .ok_or(OrderError::OrderNotFound(order_id))?;
        let cf = self.cf(CF_ORDERS)?;
        self.db.delete_cf(cf, order_id.0.to_be_bytes())?;
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::Money;
    use crate::domain::order::OrderStatus;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn widget(quantity: u32) -> Product {
        Product::new(ProductId(101), "Widget", Money::new(dec!(10.00)), quantity)
    }

    #[tokio::test]
    async fn test_rocksdb_open_cf() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).expect("Failed to open RocksDB");

        assert!(store.db.cf_handle(CF_PRODUCTS).is_some());
        assert!(store.db.cf_handle(CF_ORDERS).is_some());
        assert!(store.db.cf_handle(CF_META).is_some());
    }

    #[tokio::test]
    async fn test_rocksdb_reserve_and_release() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();

        store.insert(widget(5)).await.unwrap();
        store.reserve(ProductId(101), 3).await.unwrap();

        let err = store.reserve(ProductId(101), 3).await.unwrap_err();
        assert!(matches!(err, OrderError::InsufficientStock { .. }));

        store.release(ProductId(101), 3).await.unwrap();
        let product = InventoryStore::get(&store, ProductId(101))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(product.quantity, 5);
    }

    #[tokio::test]
    async fn test_rocksdb_order_lifecycle_roundtrip() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();

        let order = store
            .create(Order::new(UserId(1), Vec::new()))
            .await
            .unwrap();
        assert_eq!(order.id, OrderId(1));

        let updated = store
            .update(
                order.id,
                Box::new(|order| {
                    order.status = OrderStatus::Paid;
                    Ok(())
                }),
            )
            .await
            .unwrap();
        assert_eq!(updated.status, OrderStatus::Paid);

        let removed = store.delete(order.id).await.unwrap();
        assert_eq!(removed.status, OrderStatus::Paid);
        assert!(OrderRepository::get(&store, order.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rocksdb_id_counter_survives_reopen() {
        let dir = tempdir().unwrap();

        let store = RocksDBStore::open(dir.path()).unwrap();
        let first = store
            .create(Order::new(UserId(1), Vec::new()))
            .await
            .unwrap();
        assert_eq!(first.id, OrderId(1));
        drop(store);

        let store = RocksDBStore::open(dir.path()).unwrap();
        let second = store
            .create(Order::new(UserId(1), Vec::new()))
            .await
            .unwrap();
        assert_eq!(second.id, OrderId(2));
    }
}
