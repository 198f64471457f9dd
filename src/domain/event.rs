//! Detected event model and its wire format
//!
//! Each event kind is a variant with typed fields. The wire format is one
//! JSON object per event:
//!
//! ```json
//! {"timestamp":"2025-08-13T16:00:05","event_id":"E005",
//!  "event_data":{"event_name":"Long Queue Length","station_id":"SCC1","num_of_customers":6}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Staff escalation level for E008
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaffType {
    Cashier,
    Manager,
}

impl StaffType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffType::Cashier => "Cashier",
            StaffType::Manager => "Manager",
        }
    }
}

/// Recommended station action for E009
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationAction {
    Open,
    Close,
}

impl StationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            StationAction::Open => "Open",
            StationAction::Close => "Close",
        }
    }
}

/// Kind-specific event payload
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    SuccessOperation {
        station_id: String,
        customer_id: String,
        product_sku: String,
    },
    ScannerAvoidance {
        station_id: String,
        customer_id: String,
        product_sku: String,
    },
    BarcodeSwitching {
        station_id: String,
        customer_id: String,
        /// What the vision system saw
        actual_sku: String,
        /// What the POS recorded
        scanned_sku: String,
    },
    WeightDiscrepancy {
        station_id: String,
        customer_id: String,
        product_sku: String,
        expected_weight: f64,
        actual_weight: f64,
    },
    SystemCrash {
        station_id: String,
        duration_seconds: u64,
    },
    LongQueue {
        station_id: String,
        num_of_customers: u32,
    },
    LongWait {
        station_id: String,
        wait_time_seconds: f64,
    },
    InventoryDiscrepancy {
        sku: String,
        expected_inventory: u64,
        actual_inventory: u64,
    },
    StaffingNeeds {
        station_id: String,
        staff_type: StaffType,
    },
    StationAction {
        station_id: String,
        action: StationAction,
    },
}

impl EventKind {
    /// Wire identifier (`E000`..`E009`)
    pub fn event_id(&self) -> &'static str {
        match self {
            EventKind::SuccessOperation { .. } => "E000",
            EventKind::ScannerAvoidance { .. } => "E001",
            EventKind::BarcodeSwitching { .. } => "E002",
            EventKind::WeightDiscrepancy { .. } => "E003",
            EventKind::SystemCrash { .. } => "E004",
            EventKind::LongQueue { .. } => "E005",
            EventKind::LongWait { .. } => "E006",
            EventKind::InventoryDiscrepancy { .. } => "E007",
            EventKind::StaffingNeeds { .. } => "E008",
            EventKind::StationAction { .. } => "E009",
        }
    }

    /// Human-readable name carried in `event_data.event_name`
    pub fn event_name(&self) -> &'static str {
        match self {
            EventKind::SuccessOperation { .. } => "Success Operation",
            EventKind::ScannerAvoidance { .. } => "Scanner Avoidance",
            EventKind::BarcodeSwitching { .. } => "Barcode Switching",
            EventKind::WeightDiscrepancy { .. } => "Weight Discrepancies",
            EventKind::SystemCrash { .. } => "Unexpected Systems Crash",
            EventKind::LongQueue { .. } => "Long Queue Length",
            EventKind::LongWait { .. } => "Long Wait Time",
            EventKind::InventoryDiscrepancy { .. } => "Inventory Discrepancy",
            EventKind::StaffingNeeds { .. } => "Staffing Needs",
            EventKind::StationAction { .. } => "Checkout Station Action",
        }
    }

    /// Station the event refers to (inventory events have none)
    pub fn station_id(&self) -> Option<&str> {
        match self {
            EventKind::SuccessOperation { station_id, .. }
            | EventKind::ScannerAvoidance { station_id, .. }
            | EventKind::BarcodeSwitching { station_id, .. }
            | EventKind::WeightDiscrepancy { station_id, .. }
            | EventKind::SystemCrash { station_id, .. }
            | EventKind::LongQueue { station_id, .. }
            | EventKind::LongWait { station_id, .. }
            | EventKind::StaffingNeeds { station_id, .. }
            | EventKind::StationAction { station_id, .. } => Some(station_id),
            EventKind::InventoryDiscrepancy { .. } => None,
        }
    }

    /// Build the `event_data` object
    ///
    /// Weights are written as whole grams and durations as whole seconds
    /// (truncated), matching what the dashboard reads.
    fn to_event_data(&self) -> Map<String, Value> {
        let mut data = Map::new();
        data.insert("event_name".to_string(), Value::from(self.event_name()));

        match self {
            EventKind::SuccessOperation { station_id, customer_id, product_sku }
            | EventKind::ScannerAvoidance { station_id, customer_id, product_sku } => {
                data.insert("station_id".to_string(), Value::from(station_id.as_str()));
                data.insert("customer_id".to_string(), Value::from(customer_id.as_str()));
                data.insert("product_sku".to_string(), Value::from(product_sku.as_str()));
            }
            EventKind::BarcodeSwitching { station_id, customer_id, actual_sku, scanned_sku } => {
                data.insert("station_id".to_string(), Value::from(station_id.as_str()));
                data.insert("customer_id".to_string(), Value::from(customer_id.as_str()));
                data.insert("actual_sku".to_string(), Value::from(actual_sku.as_str()));
                data.insert("scanned_sku".to_string(), Value::from(scanned_sku.as_str()));
            }
            EventKind::WeightDiscrepancy {
                station_id,
                customer_id,
                product_sku,
                expected_weight,
                actual_weight,
            } => {
                data.insert("station_id".to_string(), Value::from(station_id.as_str()));
                data.insert("customer_id".to_string(), Value::from(customer_id.as_str()));
                data.insert("product_sku".to_string(), Value::from(product_sku.as_str()));
                data.insert("expected_weight".to_string(), Value::from(*expected_weight as i64));
                data.insert("actual_weight".to_string(), Value::from(*actual_weight as i64));
            }
            EventKind::SystemCrash { station_id, duration_seconds } => {
                data.insert("station_id".to_string(), Value::from(station_id.as_str()));
                data.insert("duration_seconds".to_string(), Value::from(*duration_seconds));
            }
            EventKind::LongQueue { station_id, num_of_customers } => {
                data.insert("station_id".to_string(), Value::from(station_id.as_str()));
                data.insert("num_of_customers".to_string(), Value::from(*num_of_customers));
            }
            EventKind::LongWait { station_id, wait_time_seconds } => {
                data.insert("station_id".to_string(), Value::from(station_id.as_str()));
                data.insert("wait_time_seconds".to_string(), Value::from(*wait_time_seconds as u64));
            }
            EventKind::InventoryDiscrepancy { sku, expected_inventory, actual_inventory } => {
                data.insert("SKU".to_string(), Value::from(sku.as_str()));
                data.insert("Expected_Inventory".to_string(), Value::from(*expected_inventory));
                data.insert("Actual_Inventory".to_string(), Value::from(*actual_inventory));
            }
            EventKind::StaffingNeeds { station_id, staff_type } => {
                data.insert("station_id".to_string(), Value::from(station_id.as_str()));
                data.insert("Staff_type".to_string(), Value::from(staff_type.as_str()));
            }
            EventKind::StationAction { station_id, action } => {
                data.insert("station_id".to_string(), Value::from(station_id.as_str()));
                data.insert("Action".to_string(), Value::from(action.as_str()));
            }
        }

        data
    }
}

/// One detected event, immutable once a detector creates it
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedEvent {
    pub timestamp: String,
    pub kind: EventKind,
}

impl DetectedEvent {
    pub fn new(timestamp: impl Into<String>, kind: EventKind) -> Self {
        Self { timestamp: timestamp.into(), kind }
    }

    #[inline]
    pub fn event_id(&self) -> &'static str {
        self.kind.event_id()
    }

    /// Convert to the wire record
    pub fn to_record(&self) -> EventRecord {
        EventRecord {
            timestamp: self.timestamp.clone(),
            event_id: self.event_id().to_string(),
            event_data: self.kind.to_event_data(),
        }
    }

    /// Convert to a single-line JSON string, keys in wire order
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.to_record())
    }
}

/// Event as it appears on the wire, for consumers reading the log back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub timestamp: String,
    pub event_id: String,
    pub event_data: Map<String, Value>,
}

impl EventRecord {
    /// Parse one line of an event log
    pub fn from_json_line(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line.trim())
    }
}
