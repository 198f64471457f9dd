//! Domain models - input records, catalog and detected events
//!
//! This module contains the canonical data types used throughout the system:
//! - `Timestamp` - raw timestamp text plus its parsed value
//! - `PosTransaction`, `RfidReading`, `ProductRecognition`, `QueueSample`,
//!   `InventorySnapshot` - one record of each input stream
//! - `Catalog`, `CustomerDirectory` - read-only lookups built at load
//! - `DetectedEvent`, `EventKind` - detector output and its wire format

pub mod catalog;
pub mod event;
pub mod types;

// Re-export commonly used types at module level
pub use catalog::{Catalog, CustomerDirectory};
pub use event::{DetectedEvent, EventKind, EventRecord, StaffType, StationAction};
pub use types::{
    Customer, InventorySnapshot, PosTransaction, Product, ProductRecognition, QueueSample,
    RfidReading, Timestamp,
};
