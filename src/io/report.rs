//! Analytics report - diagnostics that are not part of the event log
//!
//! Written as one pretty-printed JSON object when a report path is given.

use crate::services::anomaly::{BehavioralAnomaly, PatternAnomaly};
use crate::services::inventory::{LowStockAlert, ReorderPoint, ShrinkageAlert, VelocityMetrics};
use crate::services::queue::QueueTrend;
use anyhow::Context;
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Dwell-time sample flagged as a statistical outlier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DwellOutlier {
    pub timestamp: String,
    pub station_id: String,
    pub average_dwell_time: f64,
}

/// Pattern findings for one station's customer counts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationPatterns {
    pub station_id: String,
    pub anomalies: Vec<PatternAnomaly>,
}

/// Queue sample where customer count and dwell time moved apart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationBreak {
    pub timestamp: String,
    pub station_id: String,
    pub customer_count: u32,
    pub average_dwell_time: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalyticsReport {
    pub queue_trends: Vec<QueueTrend>,
    pub low_stock: Vec<LowStockAlert>,
    pub velocity: Vec<VelocityMetrics>,
    pub shrinkage: Vec<ShrinkageAlert>,
    pub reorder_points: Vec<ReorderPoint>,
    pub dwell_outliers: Vec<DwellOutlier>,
    pub queue_pattern_anomalies: Vec<StationPatterns>,
    pub behavioral_anomalies: Vec<BehavioralAnomaly>,
    pub queue_correlation_breaks: Vec<CorrelationBreak>,
}

impl AnalyticsReport {
    /// Write the report as pretty JSON, creating parent directories
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create report directory {}", parent.display())
                })?;
            }
        }

        let json = serde_json::to_string_pretty(self).context("Failed to serialize report")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report {}", path.display()))?;

        info!(
            file = %path.display(),
            low_stock = self.low_stock.len(),
            shrinkage = self.shrinkage.len(),
            behavioral = self.behavioral_anomalies.len(),
            "report_written"
        );
        Ok(())
    }
}
