//! Services - detectors and the detection pipeline
//!
//! This module contains the detection logic:
//! - `fraud` - Scan confirmation, scanner avoidance, barcode switching, weight checks
//! - `queue` - Queue length, wait time, staffing and station recommendations
//! - `inventory` - Stock reconciliation and stock analytics
//! - `anomaly` - Station downtime and diagnostic anomaly scoring
//! - `pipeline` - Load, detect and emit in one pass

pub mod anomaly;
pub mod fraud;
pub mod inventory;
pub mod pipeline;
pub mod queue;

use indexmap::IndexMap;

// Re-export commonly used types
pub use pipeline::{EventLog, Pipeline, RunOutcome};

/// Group records by station, keeping first-appearance order of stations and
/// input order within each station
pub(crate) fn group_by_station<'a, T, F>(
    items: &'a [T],
    station: F,
) -> IndexMap<&'a str, Vec<&'a T>>
where
    F: Fn(&'a T) -> &'a str,
{
    let mut groups: IndexMap<&'a str, Vec<&'a T>> = IndexMap::new();
    for item in items {
        groups.entry(station(item)).or_default().push(item);
    }
    groups
}
