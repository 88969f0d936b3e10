use clap::Parser;
use miette::{IntoDiagnostic, Result};
use orderflow::application::engine::{ItemRequest, OrderEngine};
use orderflow::domain::money::Money;
use orderflow::domain::order::OrderId;
use orderflow::domain::ports::{InventoryStoreBox, OrderRepositoryBox};
use orderflow::domain::product::{Product, ProductId};
use orderflow::domain::user::{Address, AddressId, User, UserId};
use orderflow::error::OrderError;
use orderflow::infrastructure::gateway::AutoApproveGateway;
use orderflow::infrastructure::in_memory::{
    InMemoryAddressBook, InMemoryInventory, InMemoryOrderRepository, InMemoryUserDirectory,
};
#[cfg(feature = "storage-rocksdb")]
use orderflow::infrastructure::rocksdb::RocksDBStore;
use orderflow::interfaces::csv::report_writer::ReportWriter;
use orderflow::interfaces::csv::scenario_reader::{OpKind, ScenarioOp, ScenarioReader};
use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input scenario CSV file
    scenario: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let cli = Cli::parse();

    let users = InMemoryUserDirectory::new();
    let addresses = InMemoryAddressBook::new();

    let inventory: InventoryStoreBox;
    let orders: OrderRepositoryBox;
    let engine_inventory: InventoryStoreBox;
    let engine_orders: OrderRepositoryBox;
    if let Some(db_path) = cli.db_path {
        #[cfg(feature = "storage-rocksdb")]
        {
            let store = RocksDBStore::open(db_path).into_diagnostic()?;
            inventory = Box::new(store.clone());
            orders = Box::new(store.clone());
            engine_inventory = Box::new(store.clone());
            engine_orders = Box::new(store);
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        {
            let _ = db_path;
            return Err(miette::miette!(
                "--db-path requires building with the storage-rocksdb feature"
            ));
        }
    } else {
        let inv = InMemoryInventory::new();
        let repo = InMemoryOrderRepository::new();
        inventory = Box::new(inv.clone());
        orders = Box::new(repo.clone());
        engine_inventory = Box::new(inv);
        engine_orders = Box::new(repo);
    }

    let engine = OrderEngine::new(
        engine_inventory,
        engine_orders,
        Box::new(users.clone()),
        Box::new(addresses.clone()),
        Box::new(AutoApproveGateway::new()),
    );

    // Replay the scenario. A bad row is reported and skipped, never fatal.
    let file = File::open(&cli.scenario).into_diagnostic()?;
    let reader = ScenarioReader::new(file);
    let mut baskets: HashMap<UserId, Vec<ItemRequest>> = HashMap::new();
    for op_result in reader.ops() {
        match op_result {
            Ok(op) => {
                if let Err(e) = apply_op(&engine, &inventory, &users, &addresses, &mut baskets, op).await
                {
                    eprintln!("Error processing op: {}", e);
                }
            }
            Err(e) => {
                eprintln!("Error reading op: {}", e);
            }
        }
    }

    // Output final state: orders first, then remaining stock.
    let all_orders = orders.list().await.into_diagnostic()?;
    let stock = inventory.list().await.into_diagnostic()?;

    let stdout = io::stdout();
    let mut writer = ReportWriter::new(stdout.lock());
    writer.write_orders(&all_orders).into_diagnostic()?;
    writer.write_stock(&stock).into_diagnostic()?;

    Ok(())
}

async fn apply_op(
    engine: &OrderEngine,
    inventory: &InventoryStoreBox,
    users: &InMemoryUserDirectory,
    addresses: &InMemoryAddressBook,
    baskets: &mut HashMap<UserId, Vec<ItemRequest>>,
    op: ScenarioOp,
) -> orderflow::error::Result<()> {
    match op.op {
        OpKind::User => {
            let id = UserId(require(op.user, "user")?);
            let name = op.name.unwrap_or_else(|| format!("user-{id}"));
            users.insert(User { id, name }).await;
        }
        OpKind::Address => {
            let user_id = UserId(require(op.user, "user")?);
            let id = AddressId(require(op.address, "address")?);
            addresses
                .insert(Address {
                    id,
                    user_id,
                    street: op.name.unwrap_or_default(),
                    city: String::new(),
                    state: String::new(),
                })
                .await;
        }
        OpKind::Product => {
            let id = ProductId(require(op.product, "product")?);
            let product = Product::new(
                id,
                op.name.unwrap_or_default(),
                Money::new(require(op.price, "price")?),
                op.quantity.unwrap_or(0),
            );
            product.validate()?;
            inventory.insert(product).await?;
        }
        OpKind::Item => {
            let user_id = UserId(require(op.user, "user")?);
            let request = ItemRequest {
                product_id: ProductId(require(op.product, "product")?),
                quantity: require(op.quantity, "quantity")?,
            };
            baskets.entry(user_id).or_default().push(request);
        }
        OpKind::Create => {
            let user_id = UserId(require(op.user, "user")?);
            let requests = baskets.remove(&user_id).unwrap_or_default();
            engine.create_order(user_id, &requests).await?;
        }
        OpKind::Pay => {
            let user_id = UserId(require(op.user, "user")?);
            let order_id = OrderId(require(op.order, "order")?);
            let method = require(op.method, "method")?;
            engine.process_payment(order_id, &method, user_id).await?;
        }
        OpKind::PayAll => {
            let user_id = UserId(require(op.user, "user")?);
            let method = require(op.method, "method")?;
            let run = engine.process_all_payments(user_id, &method).await?;
            for (order_id, err) in run.failures {
                eprintln!("Error processing op: payment for order {} failed: {}", order_id, err);
            }
        }
        OpKind::Ship => {
            let user_id = UserId(require(op.user, "user")?);
            let order_id = OrderId(require(op.order, "order")?);
            engine
                .initiate_shipping(order_id, user_id, op.address.map(AddressId))
                .await?;
        }
        OpKind::Deliver => {
            let user_id = UserId(require(op.user, "user")?);
            let order_id = OrderId(require(op.order, "order")?);
            engine.mark_as_delivered(order_id, user_id).await?;
        }
        OpKind::Fulfill => {
            let user_id = UserId(require(op.user, "user")?);
            let order_id = OrderId(require(op.order, "order")?);
            engine
                .ship_and_deliver(order_id, user_id, op.address.map(AddressId))
                .await?;
        }
        OpKind::Cancel => {
            let user_id = UserId(require(op.user, "user")?);
            let order_id = OrderId(require(op.order, "order")?);
            engine.cancel_order(order_id, user_id).await?;
        }
        OpKind::Remove => {
            let user_id = UserId(require(op.user, "user")?);
            let order_id = OrderId(require(op.order, "order")?);
            engine.remove_order(user_id, order_id).await?;
        }
    }
    Ok(())
}

fn require<T>(value: Option<T>, column: &str) -> orderflow::error::Result<T> {
    value.ok_or_else(|| OrderError::Validation(format!("missing required column: {column}")))
}
