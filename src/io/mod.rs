//! IO modules - input files and output files
//!
//! This module contains all file IO:
//! - `loader` - Catalog CSVs and JSONL sensor streams
//! - `egress` - Event log output (JSONL format)
//! - `report` - Analytics report output (JSON)

pub mod egress;
pub mod loader;
pub mod report;

// Re-export commonly used types
pub use egress::EventWriter;
pub use loader::{load_dataset, DataSet};
pub use report::AnalyticsReport;
