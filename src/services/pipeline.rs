//! Detection pipeline: Load -> Detect -> Emit
//!
//! Loads every input stream once, runs the detector categories in a fixed
//! order (fraud, queue, inventory, anomaly) into one `EventLog`, then writes
//! the log sorted by timestamp. Detectors whose inputs are missing are
//! skipped and logged.

use crate::domain::event::DetectedEvent;
use crate::infra::config::Config;
use crate::infra::summary::RunSummary;
use crate::io::egress::EventWriter;
use crate::io::loader::{
    load_dataset, DataSet, STREAM_INVENTORY, STREAM_POS, STREAM_PRODUCTS, STREAM_QUEUE,
    STREAM_RECOGNITION, STREAM_RFID,
};
use crate::io::report::{AnalyticsReport, CorrelationBreak, DwellOutlier, StationPatterns};
use crate::services::anomaly::{self, BehaviorBaseline, Correlation};
use crate::services::{fraud, group_by_station, inventory, queue};
use tracing::info;

/// Accumulates detected events across detector categories
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<DetectedEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: DetectedEvent) {
        self.events.push(event);
    }

    /// Append one detector's output, logging how many events it produced
    pub fn record(&mut self, detector: &'static str, events: Vec<DetectedEvent>) {
        info!(detector = %detector, events = events.len(), "detector_finished");
        self.events.extend(events);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DetectedEvent> {
        self.events.iter()
    }

    /// Events ordered by timestamp string; ties keep detection order
    pub fn into_sorted(self) -> Vec<DetectedEvent> {
        let mut events = self.events;
        events.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        events
    }
}

/// Everything a run produced
#[derive(Debug)]
pub struct RunOutcome {
    /// Events in output order
    pub events: Vec<DetectedEvent>,
    pub report: AnalyticsReport,
    pub summary: RunSummary,
}

/// Single-pass batch pipeline over one input directory
pub struct Pipeline<'a> {
    config: &'a Config,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Load, detect and write the event log, and the report when a path is
    /// given
    ///
    /// A missing data directory or a failed write aborts the run.
    pub fn run(&self, report_path: Option<&str>) -> anyhow::Result<RunOutcome> {
        let data = load_dataset(self.config.input())?;
        let outcome = self.process(&data);

        EventWriter::new(self.config.events_file()).write_events(&outcome.events)?;
        if let Some(path) = report_path {
            outcome.report.write_to(path)?;
        }

        outcome.summary.log();
        Ok(outcome)
    }

    /// Detect and analyze an already loaded data set, without writing
    pub fn process(&self, data: &DataSet) -> RunOutcome {
        let mut log = EventLog::new();
        self.detect(data, &mut log);
        let events = log.into_sorted();
        let report = self.analyze(data);

        let mut summary = RunSummary::new();
        for (stream, stats) in &data.stats {
            summary.record_stream(*stream, *stats);
        }
        for event in &events {
            summary.record_event(event.event_id());
        }

        RunOutcome { events, report, summary }
    }

    /// Run every enabled detector category into `log`
    pub fn detect(&self, data: &DataSet, log: &mut EventLog) {
        self.detect_fraud(data, log);
        self.detect_queue(data, log);
        self.detect_inventory(data, log);
        self.detect_anomalies(data, log);
    }

    fn detect_fraud(&self, data: &DataSet, log: &mut EventLog) {
        let config = self.config.fraud();

        if enabled(data, "success_operation", &[STREAM_POS, STREAM_RFID]) {
            log.record(
                "success_operation",
                fraud::detect_success_operations(&data.pos, &data.rfid, &data.catalog, config),
            );
        }
        if enabled(data, "scanner_avoidance_vision", &[STREAM_RECOGNITION, STREAM_POS]) {
            log.record(
                "scanner_avoidance_vision",
                fraud::detect_scanner_avoidance_vision(&data.recognitions, &data.pos, config),
            );
        }
        if enabled(data, "scanner_avoidance_rfid", &[STREAM_RFID, STREAM_POS]) {
            log.record(
                "scanner_avoidance_rfid",
                fraud::detect_scanner_avoidance_rfid(&data.rfid, &data.pos),
            );
        }
        if enabled(data, "barcode_switching", &[STREAM_POS, STREAM_RECOGNITION]) {
            log.record(
                "barcode_switching",
                fraud::detect_barcode_switching(&data.pos, &data.recognitions, config),
            );
        }
        if enabled(data, "weight_discrepancy", &[STREAM_POS, STREAM_PRODUCTS]) {
            log.record(
                "weight_discrepancy",
                fraud::detect_weight_discrepancies(&data.pos, &data.catalog, config),
            );
        }
    }

    fn detect_queue(&self, data: &DataSet, log: &mut EventLog) {
        if !enabled(data, "queue", &[STREAM_QUEUE]) {
            return;
        }
        let config = self.config.queue();

        log.record("long_queue", queue::detect_long_queues(&data.queue, config));
        log.record("long_wait", queue::detect_long_waits(&data.queue, config));
        log.record("staffing_needs", queue::predict_staffing_needs(&data.queue, config));
        log.record("station_action", queue::recommend_station_actions(&data.queue, config));
    }

    fn detect_inventory(&self, data: &DataSet, log: &mut EventLog) {
        if !enabled(data, "inventory_reconciliation", &[STREAM_INVENTORY, STREAM_POS]) {
            return;
        }

        if let Some(events) =
            inventory::reconcile_inventory(&data.inventory, &data.pos, self.config.inventory())
        {
            log.record("inventory_reconciliation", events);
        }
    }

    fn detect_anomalies(&self, data: &DataSet, log: &mut EventLog) {
        let sources = [STREAM_POS, STREAM_RFID, STREAM_QUEUE];
        if !sources.iter().any(|stream| data.has(stream)) {
            info!(detector = "system_crash", missing = ?sources, "detector_disabled");
            return;
        }

        log.record(
            "system_crash",
            anomaly::detect_system_crashes(
                &data.pos,
                &data.rfid,
                &data.queue,
                self.config.anomaly(),
            ),
        );
    }

    /// Build the analytics report from whatever inputs are present
    pub fn analyze(&self, data: &DataSet) -> AnalyticsReport {
        let inventory_config = self.config.inventory();
        let anomaly_config = self.config.anomaly();
        let mut report = AnalyticsReport::default();

        report.queue_trends = queue::analyze_queue_trends(&data.queue);

        if let Some(latest) = inventory::chronological(&data.inventory).last() {
            report.low_stock =
                inventory::monitor_stock_levels(latest, &data.catalog, inventory_config);
        }
        report.velocity = inventory::analyze_velocity(&data.inventory, &data.pos);
        let (actual, expected) = inventory::stock_changes(&data.inventory, &data.pos);
        report.shrinkage = inventory::detect_shrinkage(&actual, &expected, inventory_config);
        report.reorder_points = inventory::calculate_reorder_points(
            &report.velocity,
            inventory::observation_days(&data.inventory),
            inventory_config,
        );

        let dwell: Vec<f64> = data.queue.iter().map(|s| s.average_dwell_time).collect();
        report.dwell_outliers = anomaly::statistical_outliers(&dwell, anomaly_config.zscore_threshold)
            .into_iter()
            .map(|i| DwellOutlier {
                timestamp: data.queue[i].timestamp.as_str().to_string(),
                station_id: data.queue[i].station_id.clone(),
                average_dwell_time: data.queue[i].average_dwell_time,
            })
            .collect();

        for (station_id, history) in group_by_station(&data.queue, |s| &s.station_id) {
            let series: Vec<(String, f64)> = history
                .iter()
                .map(|s| (s.timestamp.as_str().to_string(), f64::from(s.customer_count)))
                .collect();
            let anomalies = anomaly::pattern_anomalies(&series, anomaly_config.pattern_deviation);
            if !anomalies.is_empty() {
                report
                    .queue_pattern_anomalies
                    .push(StationPatterns { station_id: station_id.to_string(), anomalies });
            }

            let customers: Vec<f64> = history.iter().map(|s| f64::from(s.customer_count)).collect();
            let waits: Vec<f64> = history.iter().map(|s| s.average_dwell_time).collect();
            for i in anomaly::correlation_breaks(&customers, &waits, Correlation::Positive) {
                report.queue_correlation_breaks.push(CorrelationBreak {
                    timestamp: history[i].timestamp.as_str().to_string(),
                    station_id: station_id.to_string(),
                    customer_count: history[i].customer_count,
                    average_dwell_time: history[i].average_dwell_time,
                });
            }
        }

        let baseline = BehaviorBaseline::from_prices(data.catalog.iter().map(|p| p.price));
        report.behavioral_anomalies = anomaly::behavioral_anomalies(&data.pos, &baseline);

        report
    }
}

/// Whether all of a detector's input streams were present
fn enabled(data: &DataSet, detector: &'static str, streams: &[&'static str]) -> bool {
    let missing: Vec<&str> = streams.iter().copied().filter(|s| !data.has(s)).collect();
    if missing.is_empty() {
        return true;
    }
    info!(detector = %detector, missing = ?missing, "detector_disabled");
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::Catalog;
    use crate::domain::event::EventKind;
    use crate::domain::types::{InventorySnapshot, PosTransaction, Product, QueueSample, Timestamp};
    use crate::infra::summary::StreamStats;

    fn present(loaded: usize) -> StreamStats {
        StreamStats { present: true, loaded, skipped: 0 }
    }

    fn tx(time: &str, sku: &str, weight: f64) -> PosTransaction {
        PosTransaction {
            timestamp: Timestamp::parse(time).unwrap(),
            station_id: "SCC1".to_string(),
            status: "Active".to_string(),
            customer_id: "C001".to_string(),
            sku: sku.to_string(),
            product_name: String::new(),
            barcode: String::new(),
            price: 100.0,
            weight_g: weight,
        }
    }

    fn sample(time: &str, customers: u32) -> QueueSample {
        QueueSample {
            timestamp: Timestamp::parse(time).unwrap(),
            station_id: "SCC1".to_string(),
            customer_count: customers,
            average_dwell_time: 30.0,
        }
    }

    fn dataset() -> DataSet {
        let mut data = DataSet {
            catalog: Catalog::from_products([Product {
                sku: "A".to_string(),
                name: "Apples".to_string(),
                catalog_quantity: 100,
                epc_range: String::new(),
                barcode: String::new(),
                weight: 100.0,
                price: 100.0,
            }]),
            pos: vec![
                tx("2025-08-13T16:00:30", "A", 150.0),
                tx("2025-08-13T16:00:40", "A", 100.0),
            ],
            queue: vec![sample("2025-08-13T16:00:05", 6), sample("2025-08-13T16:00:35", 1)],
            ..DataSet::default()
        };
        for stream in [STREAM_PRODUCTS, STREAM_POS, STREAM_QUEUE] {
            data.stats.insert(stream, present(1));
        }
        data
    }

    #[test]
    fn test_event_log_sort_is_stable() {
        let mut log = EventLog::new();
        let crash = |ts: &str, secs| {
            DetectedEvent::new(
                ts,
                EventKind::SystemCrash { station_id: "SCC1".to_string(), duration_seconds: secs },
            )
        };
        log.push(crash("2025-08-13T16:05:00", 1));
        log.push(crash("2025-08-13T16:00:00", 2));
        log.push(crash("2025-08-13T16:05:00", 3));
        assert_eq!(log.len(), 3);

        let durations: Vec<u64> = log
            .into_sorted()
            .into_iter()
            .map(|e| match e.kind {
                EventKind::SystemCrash { duration_seconds, .. } => duration_seconds,
                other => panic!("Expected SystemCrash, got {other:?}"),
            })
            .collect();
        assert_eq!(durations, vec![2, 1, 3]);
    }

    #[test]
    fn test_process_sorts_and_counts() {
        let config = Config::default();
        let outcome = Pipeline::new(&config).process(&dataset());

        let ids: Vec<&str> = outcome.events.iter().map(|e| e.event_id()).collect();
        // E005 at 16:00:05, E008 at 16:00:05, E003 at 16:00:30
        assert_eq!(ids, vec!["E005", "E008", "E003"]);
        assert!(outcome.events.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

        assert_eq!(outcome.summary.events_total(), 3);
        assert_eq!(outcome.summary.events_for("E003"), 1);
        assert!(outcome.summary.stream(STREAM_RFID).is_none());
    }

    #[test]
    fn test_mixed_timestamp_layouts_sort_chronologically() {
        let config = Config::default();
        let mut data = dataset();
        // Queue samples use a space separator, POS scans use T
        data.pos = vec![tx("2025-08-13T16:00:00", "A", 150.0)];
        data.queue = vec![sample("2025-08-13 17:00:00", 6)];

        let outcome = Pipeline::new(&config).process(&data);
        let stamps: Vec<&str> = outcome.events.iter().map(|e| e.timestamp.as_str()).collect();
        let split = stamps.iter().position(|t| *t == "2025-08-13T17:00:00").unwrap();
        assert!(split > 0);
        assert!(stamps[..split].iter().all(|t| *t == "2025-08-13T16:00:00"));
        assert!(stamps[split..].iter().all(|t| *t == "2025-08-13T17:00:00"));
        assert_eq!(outcome.events[0].event_id(), "E003");
        assert_eq!(outcome.summary.events_for("E005"), 1);
    }

    #[test]
    fn test_missing_streams_disable_detectors() {
        let config = Config::default();
        let mut data = dataset();
        data.stats.insert(STREAM_QUEUE, StreamStats::missing());
        data.queue.clear();

        let outcome = Pipeline::new(&config).process(&data);
        assert_eq!(outcome.summary.events_for("E005"), 0);
        assert_eq!(outcome.summary.events_for("E003"), 1);
        assert_eq!(outcome.summary.events_for("E001"), 0);
    }

    #[test]
    fn test_inventory_detectors_feed_events_and_report() {
        let config = Config::default();
        let mut data = dataset();
        let snapshot = |time: &str, qty: u64| InventorySnapshot {
            timestamp: Timestamp::parse(time).unwrap(),
            inventory: [("A".to_string(), qty)].into_iter().collect(),
        };
        data.inventory =
            vec![snapshot("2025-08-13T16:00:00", 100), snapshot("2025-08-13T18:00:00", 10)];
        data.stats.insert(STREAM_INVENTORY, present(2));

        let outcome = Pipeline::new(&config).process(&data);
        assert_eq!(outcome.summary.events_for("E007"), 1);
        assert_eq!(outcome.events.last().unwrap().timestamp, "2025-08-13T18:00:00");

        let report = &outcome.report;
        assert_eq!(report.low_stock.len(), 1);
        assert_eq!(report.velocity[0].sold_units, 2);
        assert_eq!(report.shrinkage[0].unexplained_loss, 88);
        assert_eq!(report.reorder_points[0].reorder_point, 10);
        assert_eq!(report.queue_trends.len(), 1);
    }
}
