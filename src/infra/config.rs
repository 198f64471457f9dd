//! Configuration loading from TOML files
//!
//! Every threshold the detectors use lives here with its default. A run
//! without a config file uses the defaults unchanged.
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/sentinel.toml

use anyhow::Context;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_products_file")]
    pub products_file: String,
    #[serde(default = "default_customers_file")]
    pub customers_file: String,
    #[serde(default = "default_pos_file")]
    pub pos_file: String,
    #[serde(default = "default_rfid_file")]
    pub rfid_file: String,
    #[serde(default = "default_recognition_file")]
    pub recognition_file: String,
    #[serde(default = "default_queue_file")]
    pub queue_file: String,
    #[serde(default = "default_inventory_file")]
    pub inventory_file: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            products_file: default_products_file(),
            customers_file: default_customers_file(),
            pos_file: default_pos_file(),
            rfid_file: default_rfid_file(),
            recognition_file: default_recognition_file(),
            queue_file: default_queue_file(),
            inventory_file: default_inventory_file(),
        }
    }
}

fn default_data_dir() -> String {
    "data/input".to_string()
}

fn default_products_file() -> String {
    "products_list.csv".to_string()
}

fn default_customers_file() -> String {
    "customer_data.csv".to_string()
}

fn default_pos_file() -> String {
    "pos_transactions.jsonl".to_string()
}

fn default_rfid_file() -> String {
    "rfid_readings.jsonl".to_string()
}

fn default_recognition_file() -> String {
    "product_recognition.jsonl".to_string()
}

fn default_queue_file() -> String {
    "queue_monitoring.jsonl".to_string()
}

fn default_inventory_file() -> String {
    "inventory_snapshots.jsonl".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// File path for the event log (JSONL format)
    #[serde(default = "default_events_file")]
    pub events_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { events_file: default_events_file() }
    }
}

fn default_events_file() -> String {
    "events.jsonl".to_string()
}

/// Fraud detector thresholds
#[derive(Debug, Clone, Deserialize)]
pub struct FraudConfig {
    /// Minimum vision confidence for avoidance checks
    #[serde(default = "default_vision_confidence")]
    pub vision_confidence: f64,
    /// Look-back from a vision detection for a matching scan (seconds)
    #[serde(default = "default_vision_window_before_secs")]
    pub vision_window_before_secs: f64,
    /// Look-ahead from a vision detection for a matching scan (seconds)
    #[serde(default = "default_vision_window_after_secs")]
    pub vision_window_after_secs: f64,
    /// Minimum vision confidence for barcode switching
    #[serde(default = "default_switching_confidence")]
    pub switching_confidence: f64,
    /// Weight difference (percent) above which a scan is flagged
    #[serde(default = "default_weight_tolerance_pct")]
    pub weight_tolerance_pct: f64,
    /// Weight difference (percent) still accepted for a clean scan
    #[serde(default = "default_success_weight_tolerance_pct")]
    pub success_weight_tolerance_pct: f64,
}

impl Default for FraudConfig {
    fn default() -> Self {
        Self {
            vision_confidence: default_vision_confidence(),
            vision_window_before_secs: default_vision_window_before_secs(),
            vision_window_after_secs: default_vision_window_after_secs(),
            switching_confidence: default_switching_confidence(),
            weight_tolerance_pct: default_weight_tolerance_pct(),
            success_weight_tolerance_pct: default_success_weight_tolerance_pct(),
        }
    }
}

fn default_vision_confidence() -> f64 {
    0.70
}

fn default_vision_window_before_secs() -> f64 {
    5.0
}

fn default_vision_window_after_secs() -> f64 {
    10.0
}

fn default_switching_confidence() -> f64 {
    0.85
}

fn default_weight_tolerance_pct() -> f64 {
    10.0
}

fn default_success_weight_tolerance_pct() -> f64 {
    15.0
}

/// Queue detector thresholds
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    /// Customer count above which a queue is long
    #[serde(default = "default_long_queue_customers")]
    pub long_queue_customers: u32,
    /// Average dwell (seconds) above which a wait is long
    #[serde(default = "default_long_wait_secs")]
    pub long_wait_secs: f64,
    /// Customer count at which staff is needed
    #[serde(default = "default_staffing_customers")]
    pub staffing_customers: u32,
    /// Average dwell (seconds) at which staff is needed
    #[serde(default = "default_staffing_wait_secs")]
    pub staffing_wait_secs: f64,
    /// Multiple of `staffing_customers` that escalates to a manager
    #[serde(default = "default_manager_multiplier")]
    pub manager_multiplier: f64,
    /// Customer count at which a station should open
    #[serde(default = "default_open_customers")]
    pub open_customers: u32,
    /// Customer count at or below which a station may close
    #[serde(default = "default_close_customers")]
    pub close_customers: u32,
    /// Trailing samples averaged before recommending a close
    #[serde(default = "default_close_window")]
    pub close_window: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            long_queue_customers: default_long_queue_customers(),
            long_wait_secs: default_long_wait_secs(),
            staffing_customers: default_staffing_customers(),
            staffing_wait_secs: default_staffing_wait_secs(),
            manager_multiplier: default_manager_multiplier(),
            open_customers: default_open_customers(),
            close_customers: default_close_customers(),
            close_window: default_close_window(),
        }
    }
}

fn default_long_queue_customers() -> u32 {
    5
}

fn default_long_wait_secs() -> f64 {
    300.0
}

fn default_staffing_customers() -> u32 {
    5
}

fn default_staffing_wait_secs() -> f64 {
    300.0
}

fn default_manager_multiplier() -> f64 {
    1.5
}

fn default_open_customers() -> u32 {
    5
}

fn default_close_customers() -> u32 {
    2
}

fn default_close_window() -> usize {
    3
}

/// Inventory thresholds
#[derive(Debug, Clone, Deserialize)]
pub struct InventoryConfig {
    /// Unit difference above which reconciliation flags a SKU
    #[serde(default = "default_tolerance_units")]
    pub tolerance_units: u64,
    /// Stock ratio (current / catalog) at or below which stock is low
    #[serde(default = "default_low_stock_ratio")]
    pub low_stock_ratio: f64,
    /// Unexplained unit loss above which shrinkage is flagged
    #[serde(default = "default_shrinkage_threshold")]
    pub shrinkage_threshold: i64,
    #[serde(default = "default_lead_time_days")]
    pub lead_time_days: u32,
    #[serde(default = "default_safety_stock_days")]
    pub safety_stock_days: u32,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            tolerance_units: default_tolerance_units(),
            low_stock_ratio: default_low_stock_ratio(),
            shrinkage_threshold: default_shrinkage_threshold(),
            lead_time_days: default_lead_time_days(),
            safety_stock_days: default_safety_stock_days(),
        }
    }
}

fn default_tolerance_units() -> u64 {
    5
}

fn default_low_stock_ratio() -> f64 {
    0.2
}

fn default_shrinkage_threshold() -> i64 {
    3
}

fn default_lead_time_days() -> u32 {
    3
}

fn default_safety_stock_days() -> u32 {
    2
}

/// Downtime and outlier thresholds
#[derive(Debug, Clone, Deserialize)]
pub struct AnomalyConfig {
    /// Silence (seconds) between records at a station that counts as a crash
    #[serde(default = "default_crash_min_gap_secs")]
    pub crash_min_gap_secs: f64,
    /// Minimum crash duration (seconds) worth reporting
    #[serde(default = "default_crash_min_duration_secs")]
    pub crash_min_duration_secs: u64,
    #[serde(default = "default_zscore_threshold")]
    pub zscore_threshold: f64,
    /// Relative deviation from the moving average that marks a pattern break
    #[serde(default = "default_pattern_deviation")]
    pub pattern_deviation: f64,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            crash_min_gap_secs: default_crash_min_gap_secs(),
            crash_min_duration_secs: default_crash_min_duration_secs(),
            zscore_threshold: default_zscore_threshold(),
            pattern_deviation: default_pattern_deviation(),
        }
    }
}

fn default_crash_min_gap_secs() -> f64 {
    120.0
}

fn default_crash_min_duration_secs() -> u64 {
    60
}

fn default_zscore_threshold() -> f64 {
    2.0
}

fn default_pattern_deviation() -> f64 {
    0.5
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub fraud: FraudConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub inventory: InventoryConfig,
    #[serde(default)]
    pub anomaly: AnomalyConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    input: InputConfig,
    output: OutputConfig,
    fraud: FraudConfig,
    queue: QueueConfig,
    inventory: InventoryConfig,
    anomaly: AnomalyConfig,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default".to_string())
    }
}

impl Config {
    fn from_toml(toml_config: TomlConfig, config_file: String) -> Self {
        Self {
            input: toml_config.input,
            output: toml_config.output,
            fraud: toml_config.fraud,
            queue: toml_config.queue,
            inventory: toml_config.inventory,
            anomaly: toml_config.anomaly,
            config_file,
        }
    }

    /// Determine config file path from an explicit argument or environment
    pub fn resolve_config_path(explicit: Option<&str>) -> String {
        if let Some(path) = explicit {
            return path.to_string();
        }

        if let Ok(path) = env::var("CONFIG_FILE") {
            return path;
        }

        "config/sentinel.toml".to_string()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self::from_toml(toml_config, path.display().to_string()))
    }

    /// Load configuration - tries TOML file first, falls back to defaults
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %format!("{:#}", e), "config_load_failed_using_defaults");
                Self::default()
            }
        }
    }

    pub fn input(&self) -> &InputConfig {
        &self.input
    }

    pub fn fraud(&self) -> &FraudConfig {
        &self.fraud
    }

    pub fn queue(&self) -> &QueueConfig {
        &self.queue
    }

    pub fn inventory(&self) -> &InventoryConfig {
        &self.inventory
    }

    pub fn anomaly(&self) -> &AnomalyConfig {
        &self.anomaly
    }

    pub fn data_dir(&self) -> &str {
        &self.input.data_dir
    }

    pub fn events_file(&self) -> &str {
        &self.output.events_file
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Override the input directory (CLI takes precedence over the file)
    pub fn with_data_dir(mut self, data_dir: &str) -> Self {
        self.input.data_dir = data_dir.to_string();
        self
    }

    /// Override the event log path (CLI takes precedence over the file)
    pub fn with_events_file(mut self, events_file: &str) -> Self {
        self.output.events_file = events_file.to_string();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.config_file(), "default");
        assert_eq!(config.data_dir(), "data/input");
        assert_eq!(config.events_file(), "events.jsonl");
        assert_eq!(config.fraud().vision_confidence, 0.70);
        assert_eq!(config.fraud().switching_confidence, 0.85);
        assert_eq!(config.fraud().weight_tolerance_pct, 10.0);
        assert_eq!(config.fraud().success_weight_tolerance_pct, 15.0);
        assert_eq!(config.queue().long_queue_customers, 5);
        assert_eq!(config.queue().long_wait_secs, 300.0);
        assert_eq!(config.queue().manager_multiplier, 1.5);
        assert_eq!(config.queue().close_window, 3);
        assert_eq!(config.inventory().tolerance_units, 5);
        assert_eq!(config.anomaly().crash_min_gap_secs, 120.0);
    }

    #[test]
    fn test_default_input_files() {
        let input = InputConfig::default();
        assert_eq!(input.products_file, "products_list.csv");
        assert_eq!(input.customers_file, "customer_data.csv");
        assert_eq!(input.pos_file, "pos_transactions.jsonl");
        assert_eq!(input.inventory_file, "inventory_snapshots.jsonl");
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let toml_config: TomlConfig = toml::from_str(
            r#"
[queue]
long_queue_customers = 8
"#,
        )
        .unwrap();
        let config = Config::from_toml(toml_config, "inline".to_string());
        assert_eq!(config.queue().long_queue_customers, 8);
        assert_eq!(config.queue().open_customers, 5);
        assert_eq!(config.fraud().vision_confidence, 0.70);
    }

    #[test]
    fn test_resolve_config_path_explicit() {
        assert_eq!(Config::resolve_config_path(Some("config/store.toml")), "config/store.toml");
    }

    #[test]
    fn test_cli_overrides() {
        let config = Config::default().with_data_dir("/tmp/in").with_events_file("/tmp/out.jsonl");
        assert_eq!(config.data_dir(), "/tmp/in");
        assert_eq!(config.events_file(), "/tmp/out.jsonl");
    }
}
