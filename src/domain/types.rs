//! Input record types for the detection run
//!
//! Every record is built once by the loader and only read afterwards.

use chrono::{DateTime, NaiveDateTime};
use thiserror::Error;

/// Naive date-time layouts accepted in input files (station-local time)
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Timestamp that could not be read by any accepted layout
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unparseable timestamp {0:?}")]
pub struct TimestampError(pub String);

/// ISO-8601 timestamp keeping both the raw text and the parsed value
///
/// The raw string is what gets written out and what the event log is ordered
/// by; the parsed value is used for window and gap arithmetic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamp {
    raw: String,
    at: NaiveDateTime,
}

impl Timestamp {
    /// Parse an input timestamp.
    ///
    /// Offsets in RFC 3339 input are dropped: all streams are recorded in
    /// station-local time. A space between date and time is stored as `T` so
    /// that raw strings from every stream order the same way.
    pub fn parse(raw: &str) -> Result<Self, TimestampError> {
        let trimmed = raw.trim();

        for format in NAIVE_FORMATS {
            if let Ok(at) = NaiveDateTime::parse_from_str(trimmed, format) {
                return Ok(Self { raw: trimmed.replacen(' ', "T", 1), at });
            }
        }

        DateTime::parse_from_rfc3339(trimmed)
            .map(|dt| Self { raw: trimmed.to_string(), at: dt.naive_local() })
            .map_err(|_| TimestampError(raw.to_string()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[inline]
    pub fn at(&self) -> NaiveDateTime {
        self.at
    }

    /// Signed number of seconds from `self` to `later` (millisecond precision)
    pub fn seconds_until(&self, later: &Timestamp) -> f64 {
        (later.at - self.at).num_milliseconds() as f64 / 1000.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Catalog entry for one product
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub sku: String,
    pub name: String,
    pub catalog_quantity: u64,
    /// `"START-END"`, compared lexicographically
    pub epc_range: String,
    pub barcode: String,
    /// Grams
    pub weight: f64,
    pub price: f64,
}

/// Customer reference data
#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    pub customer_id: String,
    pub name: String,
    pub age: Option<String>,
    pub address: Option<String>,
    pub phone: String,
}

/// One checkout scan at a POS terminal
#[derive(Debug, Clone, PartialEq)]
pub struct PosTransaction {
    pub timestamp: Timestamp,
    pub station_id: String,
    pub status: String,
    pub customer_id: String,
    pub sku: String,
    pub product_name: String,
    pub barcode: String,
    pub price: f64,
    pub weight_g: f64,
}

impl PosTransaction {
    /// Status check used by success detection (case-insensitive)
    #[inline]
    pub fn is_success(&self) -> bool {
        self.status.eq_ignore_ascii_case("success")
    }
}

/// One RFID tag detection
#[derive(Debug, Clone, PartialEq)]
pub struct RfidReading {
    pub timestamp: Timestamp,
    pub station_id: String,
    pub epc: String,
    pub location: String,
    pub sku: String,
}

/// One vision-system product prediction
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRecognition {
    pub timestamp: Timestamp,
    pub station_id: String,
    pub predicted_product: String,
    /// Confidence in 0..1
    pub accuracy: f64,
}

/// One queue sensor sample
#[derive(Debug, Clone, PartialEq)]
pub struct QueueSample {
    pub timestamp: Timestamp,
    pub station_id: String,
    pub customer_count: u32,
    /// Seconds
    pub average_dwell_time: f64,
}

/// Point-in-time stock count for every SKU
///
/// Quantities keep file order so reconciliation output is deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct InventorySnapshot {
    pub timestamp: Timestamp,
    pub inventory: indexmap::IndexMap<String, u64>,
}
