use crate::error::{OrderError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

/// The operations a scenario file can drive. Seed ops (`user`, `address`,
/// `product`) populate the collaborator stores; the rest call the engine.
#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
pub enum OpKind {
    User,
    Address,
    Product,
    Item,
    Create,
    Pay,
    PayAll,
    Ship,
    Deliver,
    Fulfill,
    Cancel,
    Remove,
}

/// A single scenario row. Columns an op does not use stay empty.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct ScenarioOp {
    pub op: OpKind,
    pub user: Option<u64>,
    pub order: Option<u64>,
    pub product: Option<u64>,
    pub quantity: Option<u32>,
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub method: Option<String>,
    pub address: Option<u64>,
}

/// Reads scenario operations from a CSV source.
///
/// Wraps `csv::Reader` and provides an iterator over `Result<ScenarioOp>`,
/// trimming whitespace and accepting flexible record lengths so scenario
/// files stay hand-editable.
pub struct ScenarioReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> ScenarioReader<R> {
    /// Creates a new `ScenarioReader` from any `Read` source.
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes ops, so large
    /// scenario files stream without loading into memory.
    pub fn ops(self) -> impl Iterator<Item = Result<ScenarioOp>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(OrderError::from))
    }
}
