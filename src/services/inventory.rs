//! Inventory reconciliation and stock analytics
//!
//! Reconciliation (E007) compares the stock the sales imply with the stock
//! that was counted. The remaining functions feed the analytics report.

use crate::domain::catalog::Catalog;
use crate::domain::event::{DetectedEvent, EventKind};
use crate::domain::types::{InventorySnapshot, PosTransaction};
use crate::infra::config::InventoryConfig;
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::{debug, info};

/// Days-of-stock reported when nothing sold
const NO_SALES_REMAINING_DAYS: f64 = 999.0;

/// Snapshots in chronological order; equal timestamps keep file order
pub fn chronological(snapshots: &[InventorySnapshot]) -> Vec<&InventorySnapshot> {
    let mut sorted: Vec<&InventorySnapshot> = snapshots.iter().collect();
    sorted.sort_by_key(|s| s.timestamp.at());
    sorted
}

/// Units sold per SKU, one per transaction
fn sales_per_sku(transactions: &[PosTransaction]) -> FxHashMap<&str, u64> {
    let mut sales: FxHashMap<&str, u64> = FxHashMap::default();
    for tx in transactions {
        *sales.entry(tx.sku.as_str()).or_insert(0) += 1;
    }
    sales
}

/// E007: SKUs whose counted stock differs from the expected stock
///
/// Expected stock starts from the earliest snapshot and loses one unit per
/// transaction, never going below zero. SKUs absent from the earliest
/// snapshot are not tracked. Returns `None` when there are fewer than two
/// snapshots to compare.
pub fn reconcile_inventory(
    snapshots: &[InventorySnapshot],
    transactions: &[PosTransaction],
    config: &InventoryConfig,
) -> Option<Vec<DetectedEvent>> {
    let sorted = chronological(snapshots);
    let (first, last) = match sorted.as_slice() {
        [first, .., last] => (*first, *last),
        _ => {
            info!(snapshots = snapshots.len(), "inventory_reconciliation_skipped");
            return None;
        }
    };

    let mut expected: IndexMap<&str, u64> =
        first.inventory.iter().map(|(sku, qty)| (sku.as_str(), *qty)).collect();
    for tx in transactions {
        if let Some(qty) = expected.get_mut(tx.sku.as_str()) {
            *qty = qty.saturating_sub(1);
        }
    }

    let events = expected
        .into_iter()
        .filter_map(|(sku, expected_qty)| {
            let actual_qty = last.inventory.get(sku).copied().unwrap_or(0);
            if expected_qty.abs_diff(actual_qty) <= config.tolerance_units {
                return None;
            }
            debug!(sku = %sku, expected = expected_qty, actual = actual_qty, "inventory_mismatch");
            Some(DetectedEvent::new(
                last.timestamp.as_str(),
                EventKind::InventoryDiscrepancy {
                    sku: sku.to_string(),
                    expected_inventory: expected_qty,
                    actual_inventory: actual_qty,
                },
            ))
        })
        .collect();

    Some(events)
}

/// Catalog product running low in a snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LowStockAlert {
    pub sku: String,
    pub product_name: String,
    pub current_quantity: u64,
    pub expected_quantity: u64,
    /// Current stock as a percentage of the catalog quantity
    pub stock_percentage: f64,
    pub timestamp: String,
}

/// SKUs at or below `low_stock_ratio` of their catalog quantity
///
/// SKUs missing from the catalog, or listed with zero quantity, are skipped.
pub fn monitor_stock_levels(
    snapshot: &InventorySnapshot,
    catalog: &Catalog,
    config: &InventoryConfig,
) -> Vec<LowStockAlert> {
    snapshot
        .inventory
        .iter()
        .filter_map(|(sku, current)| {
            let product = catalog.get(sku)?;
            if product.catalog_quantity == 0 {
                return None;
            }
            let ratio = *current as f64 / product.catalog_quantity as f64;
            (ratio <= config.low_stock_ratio).then(|| LowStockAlert {
                sku: sku.clone(),
                product_name: product.name.clone(),
                current_quantity: *current,
                expected_quantity: product.catalog_quantity,
                stock_percentage: *current as f64 * 100.0 / product.catalog_quantity as f64,
                timestamp: snapshot.timestamp.as_str().to_string(),
            })
        })
        .collect()
}

/// Turnover figures for one SKU
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VelocityMetrics {
    pub sku: String,
    pub initial_quantity: u64,
    pub final_quantity: u64,
    pub sold_units: u64,
    /// Units sold as a percentage of the initial stock
    pub turnover_rate: f64,
    /// Estimated snapshots-worth of stock left at the current sales pace
    pub remaining_days: f64,
}

/// Turnover per SKU of the earliest snapshot
///
/// Empty when there are no snapshots or no transactions.
pub fn analyze_velocity(
    snapshots: &[InventorySnapshot],
    transactions: &[PosTransaction],
) -> Vec<VelocityMetrics> {
    let sorted = chronological(snapshots);
    let (Some(first), Some(last)) = (sorted.first(), sorted.last()) else {
        return Vec::new();
    };
    if transactions.is_empty() {
        return Vec::new();
    }

    let sales = sales_per_sku(transactions);
    let snapshot_count = sorted.len() as f64;

    first
        .inventory
        .iter()
        .map(|(sku, initial)| {
            let final_quantity = last.inventory.get(sku).copied().unwrap_or(0);
            let sold = sales.get(sku.as_str()).copied().unwrap_or(0);
            VelocityMetrics {
                sku: sku.clone(),
                initial_quantity: *initial,
                final_quantity,
                sold_units: sold,
                turnover_rate: if *initial > 0 {
                    sold as f64 / *initial as f64 * 100.0
                } else {
                    0.0
                },
                remaining_days: if sold > 0 {
                    final_quantity as f64 / (sold as f64 / snapshot_count)
                } else {
                    NO_SALES_REMAINING_DAYS
                },
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Medium,
    High,
}

/// Stock lost beyond what sales explain
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShrinkageAlert {
    pub sku: String,
    pub expected_change: i64,
    pub actual_change: i64,
    pub unexplained_loss: i64,
    pub severity: Severity,
}

/// Compare expected with actual stock changes per SKU
///
/// Changes are signed: a sale of ten units is an expected change of `-10`.
/// A SKU with no recorded actual change is treated as unchanged.
pub fn detect_shrinkage(
    actual_changes: &IndexMap<String, i64>,
    expected_changes: &IndexMap<String, i64>,
    config: &InventoryConfig,
) -> Vec<ShrinkageAlert> {
    let threshold = config.shrinkage_threshold;

    expected_changes
        .iter()
        .filter_map(|(sku, expected)| {
            let actual = actual_changes.get(sku).copied().unwrap_or(0);
            let unexplained_loss = expected - actual;
            (unexplained_loss > threshold).then(|| ShrinkageAlert {
                sku: sku.clone(),
                expected_change: *expected,
                actual_change: actual,
                unexplained_loss,
                severity: if unexplained_loss > threshold * 2 {
                    Severity::High
                } else {
                    Severity::Medium
                },
            })
        })
        .collect()
}

/// Expected and actual stock changes between the earliest and latest snapshot
///
/// Returns `(actual, expected)`, keyed by the SKUs of the earliest snapshot.
pub fn stock_changes(
    snapshots: &[InventorySnapshot],
    transactions: &[PosTransaction],
) -> (IndexMap<String, i64>, IndexMap<String, i64>) {
    let sorted = chronological(snapshots);
    let (Some(first), Some(last)) = (sorted.first(), sorted.last()) else {
        return (IndexMap::new(), IndexMap::new());
    };

    let sales = sales_per_sku(transactions);
    let mut actual = IndexMap::new();
    let mut expected = IndexMap::new();
    for (sku, initial) in &first.inventory {
        let final_quantity = last.inventory.get(sku).copied().unwrap_or(0);
        let sold = sales.get(sku.as_str()).copied().unwrap_or(0);
        actual.insert(sku.clone(), final_quantity as i64 - *initial as i64);
        expected.insert(sku.clone(), -(sold as i64));
    }
    (actual, expected)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReorderPoint {
    pub sku: String,
    pub daily_rate: f64,
    pub reorder_point: u64,
}

/// Reorder levels for SKUs that sold at least one unit
///
/// `days` is the observation period; anything below one day counts as one.
pub fn calculate_reorder_points(
    velocity: &[VelocityMetrics],
    days: u32,
    config: &InventoryConfig,
) -> Vec<ReorderPoint> {
    let days = f64::from(days.max(1));
    let cover_days = f64::from(config.lead_time_days) + f64::from(config.safety_stock_days);

    velocity
        .iter()
        .filter(|v| v.sold_units > 0)
        .map(|v| {
            let daily_rate = v.sold_units as f64 / days;
            ReorderPoint {
                sku: v.sku.clone(),
                daily_rate,
                reorder_point: (daily_rate * cover_days).floor() as u64,
            }
        })
        .collect()
}

/// Whole days between the earliest and latest snapshot
pub fn observation_days(snapshots: &[InventorySnapshot]) -> u32 {
    let sorted = chronological(snapshots);
    match (sorted.first(), sorted.last()) {
        (Some(first), Some(last)) => {
            let days = (last.timestamp.at() - first.timestamp.at()).num_days();
            u32::try_from(days).unwrap_or(0)
        }
        _ => 0,
    }
}
