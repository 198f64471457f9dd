//! Record loader - reads the input directory into typed records
//!
//! Reads the CSV reference tables and the JSONL telemetry streams once, up
//! front. A missing file disables whatever depends on it; a malformed line
//! or row is logged and skipped; a missing data directory aborts the run.

use crate::domain::catalog::{Catalog, CustomerDirectory};
use crate::domain::types::{
    Customer, InventorySnapshot, PosTransaction, Product, ProductRecognition, QueueSample,
    RfidReading, Timestamp, TimestampError,
};
use crate::infra::config::InputConfig;
use crate::infra::summary::StreamStats;
use anyhow::Context;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const STREAM_PRODUCTS: &str = "products";
pub const STREAM_CUSTOMERS: &str = "customers";
pub const STREAM_POS: &str = "pos";
pub const STREAM_RFID: &str = "rfid";
pub const STREAM_RECOGNITION: &str = "recognition";
pub const STREAM_QUEUE: &str = "queue";
pub const STREAM_INVENTORY: &str = "inventory";

/// Why a single record was dropped
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Timestamp(#[from] TimestampError),
}

/// Common shape of the telemetry streams
#[derive(Debug, Deserialize)]
struct StreamEnvelope<T> {
    timestamp: String,
    #[serde(default)]
    station_id: String,
    #[serde(default)]
    status: String,
    data: T,
}

#[derive(Debug, Deserialize)]
struct PosData {
    #[serde(default)]
    customer_id: Option<String>,
    sku: String,
    #[serde(default)]
    product_name: String,
    #[serde(default, deserialize_with = "deserialize_text")]
    barcode: String,
    #[serde(default)]
    price: f64,
    weight_g: f64,
}

/// Barcodes arrive either as strings or as bare JSON numbers
fn deserialize_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, Visitor};

    struct TextVisitor;

    impl<'de> Visitor<'de> for TextVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a string or number")
        }

        fn visit_str<E>(self, value: &str) -> Result<String, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_string<E>(self, value: String) -> Result<String, E>
        where
            E: de::Error,
        {
            Ok(value)
        }

        fn visit_u64<E>(self, value: u64) -> Result<String, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_i64<E>(self, value: i64) -> Result<String, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_unit<E>(self) -> Result<String, E>
        where
            E: de::Error,
        {
            Ok(String::new())
        }
    }

    deserializer.deserialize_any(TextVisitor)
}

#[derive(Debug, Deserialize)]
struct RfidData {
    #[serde(default)]
    epc: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    sku: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RecognitionData {
    predicted_product: String,
    accuracy: f64,
}

#[derive(Debug, Deserialize)]
struct QueueData {
    customer_count: u32,
    average_dwell_time: f64,
}

#[derive(Debug, Deserialize)]
struct InventoryLine {
    timestamp: String,
    data: IndexMap<String, u64>,
}

#[derive(Debug, Deserialize)]
struct ProductRow {
    #[serde(rename = "SKU")]
    sku: String,
    #[serde(default)]
    product_name: String,
    #[serde(default)]
    quantity: u64,
    #[serde(rename = "EPC_range", default)]
    epc_range: String,
    #[serde(default)]
    barcode: String,
    weight: f64,
    #[serde(default)]
    price: f64,
}

#[derive(Debug, Deserialize)]
struct CustomerRow {
    #[serde(rename = "Customer_ID")]
    customer_id: String,
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "Age", default)]
    age: Option<String>,
    #[serde(rename = "Address", default)]
    address: Option<String>,
    #[serde(rename = "TP", alias = "Phone", default)]
    phone: String,
}

/// Everything a detection run reads, loaded once
#[derive(Debug, Clone, Default)]
pub struct DataSet {
    pub catalog: Catalog,
    pub customers: CustomerDirectory,
    pub pos: Vec<PosTransaction>,
    pub rfid: Vec<RfidReading>,
    pub recognitions: Vec<ProductRecognition>,
    pub queue: Vec<QueueSample>,
    pub inventory: Vec<InventorySnapshot>,
    /// Load outcome per stream, in load order
    pub stats: IndexMap<&'static str, StreamStats>,
}

impl DataSet {
    /// Whether a stream's file existed
    pub fn has(&self, stream: &str) -> bool {
        self.stats.get(stream).is_some_and(|s| s.present)
    }
}

/// Load every input file from the configured directory
pub fn load_dataset(input: &InputConfig) -> anyhow::Result<DataSet> {
    let dir = Path::new(&input.data_dir);
    if !dir.is_dir() {
        anyhow::bail!("data directory {} does not exist", dir.display());
    }

    info!(data_dir = %dir.display(), "loading_input");

    let mut data = DataSet::default();

    let (products, stats) = read_csv(&dir.join(&input.products_file), STREAM_PRODUCTS, product)?;
    data.catalog = Catalog::from_products(products);
    data.stats.insert(STREAM_PRODUCTS, stats);

    let (customers, stats) =
        read_csv(&dir.join(&input.customers_file), STREAM_CUSTOMERS, customer)?;
    data.customers = CustomerDirectory::from_customers(customers);
    data.stats.insert(STREAM_CUSTOMERS, stats);

    let (pos, stats) = read_jsonl(&dir.join(&input.pos_file), STREAM_POS, pos_transaction)?;
    data.pos = pos;
    data.stats.insert(STREAM_POS, stats);

    let (rfid, stats) = read_jsonl(&dir.join(&input.rfid_file), STREAM_RFID, rfid_reading)?;
    data.rfid = rfid;
    data.stats.insert(STREAM_RFID, stats);

    let (recognitions, stats) =
        read_jsonl(&dir.join(&input.recognition_file), STREAM_RECOGNITION, recognition)?;
    data.recognitions = recognitions;
    data.stats.insert(STREAM_RECOGNITION, stats);

    let (queue, stats) = read_jsonl(&dir.join(&input.queue_file), STREAM_QUEUE, queue_sample)?;
    data.queue = queue;
    data.stats.insert(STREAM_QUEUE, stats);

    let (inventory, stats) =
        read_jsonl(&dir.join(&input.inventory_file), STREAM_INVENTORY, inventory_snapshot)?;
    data.inventory = inventory;
    data.stats.insert(STREAM_INVENTORY, stats);

    Ok(data)
}

/// Read a CSV table with headers, skipping rows that fail to convert
fn read_csv<R, T, F>(
    path: &Path,
    stream: &'static str,
    convert: F,
) -> anyhow::Result<(Vec<T>, StreamStats)>
where
    R: DeserializeOwned,
    F: Fn(R) -> T,
{
    if !path.exists() {
        info!(stream = %stream, path = %path.display(), "input_missing_stream_disabled");
        return Ok((Vec::new(), StreamStats::missing()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let mut records = Vec::new();
    let mut stats = StreamStats { present: true, ..StreamStats::default() };

    for (index, row) in reader.deserialize::<R>().enumerate() {
        match row {
            Ok(row) => {
                records.push(convert(row));
                stats.loaded += 1;
            }
            Err(e) => {
                stats.skipped += 1;
                let error = RecordError::from(e);
                // Header is line 1
                warn!(stream = %stream, line = index + 2, error = %error, "record_skipped");
            }
        }
    }

    info!(stream = %stream, loaded = stats.loaded, skipped = stats.skipped, "stream_loaded");
    Ok((records, stats))
}

/// Read a JSONL stream, skipping blank lines and lines that fail to convert
fn read_jsonl<R, T, F>(
    path: &Path,
    stream: &'static str,
    convert: F,
) -> anyhow::Result<(Vec<T>, StreamStats)>
where
    R: DeserializeOwned,
    F: Fn(R) -> Result<T, RecordError>,
{
    if !path.exists() {
        info!(stream = %stream, path = %path.display(), "input_missing_stream_disabled");
        return Ok((Vec::new(), StreamStats::missing()));
    }

    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    let mut stats = StreamStats { present: true, ..StreamStats::default() };

    for (index, line) in reader.lines().enumerate() {
        let parsed = line.map_err(RecordError::from).and_then(|line| {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            let raw: R = serde_json::from_str(trimmed)?;
            convert(raw).map(Some)
        });

        match parsed {
            Ok(Some(record)) => {
                records.push(record);
                stats.loaded += 1;
            }
            Ok(None) => {}
            Err(error) => {
                stats.skipped += 1;
                warn!(stream = %stream, line = index + 1, error = %error, "record_skipped");
            }
        }
    }

    info!(stream = %stream, loaded = stats.loaded, skipped = stats.skipped, "stream_loaded");
    Ok((records, stats))
}

fn product(row: ProductRow) -> Product {
    Product {
        sku: row.sku,
        name: row.product_name,
        catalog_quantity: row.quantity,
        epc_range: row.epc_range,
        barcode: row.barcode,
        weight: row.weight,
        price: row.price,
    }
}

fn customer(row: CustomerRow) -> Customer {
    Customer {
        customer_id: row.customer_id,
        name: row.name,
        age: row.age.filter(|s| !s.is_empty()),
        address: row.address.filter(|s| !s.is_empty()),
        phone: row.phone,
    }
}

fn pos_transaction(raw: StreamEnvelope<PosData>) -> Result<PosTransaction, RecordError> {
    Ok(PosTransaction {
        timestamp: Timestamp::parse(&raw.timestamp)?,
        station_id: raw.station_id,
        status: raw.status,
        customer_id: raw.data.customer_id.unwrap_or_else(|| "UNKNOWN".to_string()),
        sku: raw.data.sku,
        product_name: raw.data.product_name,
        barcode: raw.data.barcode,
        price: raw.data.price,
        weight_g: raw.data.weight_g,
    })
}

fn rfid_reading(raw: StreamEnvelope<RfidData>) -> Result<RfidReading, RecordError> {
    Ok(RfidReading {
        timestamp: Timestamp::parse(&raw.timestamp)?,
        station_id: raw.station_id,
        epc: raw.data.epc,
        location: raw.data.location,
        sku: raw.data.sku.unwrap_or_default(),
    })
}

fn recognition(raw: StreamEnvelope<RecognitionData>) -> Result<ProductRecognition, RecordError> {
    Ok(ProductRecognition {
        timestamp: Timestamp::parse(&raw.timestamp)?,
        station_id: raw.station_id,
        predicted_product: raw.data.predicted_product,
        accuracy: raw.data.accuracy,
    })
}

fn queue_sample(raw: StreamEnvelope<QueueData>) -> Result<QueueSample, RecordError> {
    Ok(QueueSample {
        timestamp: Timestamp::parse(&raw.timestamp)?,
        station_id: raw.station_id,
        customer_count: raw.data.customer_count,
        average_dwell_time: raw.data.average_dwell_time,
    })
}

fn inventory_snapshot(raw: InventoryLine) -> Result<InventorySnapshot, RecordError> {
    let timestamp = Timestamp::parse(&raw.timestamp)?;
    debug!(timestamp = %timestamp, skus = raw.data.len(), "inventory_snapshot_read");
    Ok(InventorySnapshot { timestamp, inventory: raw.data })
}
