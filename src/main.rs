//! Checkout Sentinel - batch event detection for self-checkout stations
//!
//! Reads one directory of sensor streams and catalog files, runs the fraud,
//! queue, inventory and anomaly detectors, and writes a single
//! timestamp-ordered JSONL event log.
//!
//! Module structure:
//! - `domain/` - Core business types (records, catalog, events)
//! - `io/` - File interfaces (loader, event egress, analytics report)
//! - `services/` - Detectors and the pipeline
//! - `infra/` - Infrastructure (Config, run summary)

use checkout_sentinel::infra::Config;
use checkout_sentinel::services::Pipeline;
use clap::Parser;
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Checkout Sentinel - detect fraud, queue, inventory and outage events
#[derive(Parser, Debug)]
#[command(name = "checkout-sentinel", version, about)]
struct Args {
    /// Directory holding the input files (overrides `[input] data_dir`)
    #[arg(short, long)]
    data_dir: Option<String>,

    /// Event log to write (overrides `[output] events_file`)
    #[arg(short, long)]
    output: Option<String>,

    /// Path to TOML configuration file
    ///
    /// Falls back to $CONFIG_FILE, then config/sentinel.toml. A missing or
    /// invalid file means built-in defaults.
    #[arg(short, long)]
    config: Option<String>,

    /// Also write the analytics report (JSON) to this path
    #[arg(short, long)]
    report: Option<String>,

    /// Emit logs as JSON lines instead of text
    #[arg(long)]
    json_logs: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize structured logging with configurable level via RUST_LOG env var
    // Default: INFO, use RUST_LOG=debug for per-event detail
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false);
    if args.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!(git_hash = env!("GIT_HASH"), "checkout-sentinel starting");

    let mut config = Config::load_from_path(Config::resolve_config_path(args.config.as_deref()));
    if let Some(data_dir) = &args.data_dir {
        config = config.with_data_dir(data_dir);
    }
    if let Some(output) = &args.output {
        config = config.with_events_file(output);
    }

    info!(
        config_file = %config.config_file(),
        data_dir = %config.data_dir(),
        events_file = %config.events_file(),
        report = ?args.report,
        "config_loaded"
    );

    let outcome = Pipeline::new(&config).run(args.report.as_deref())?;

    info!(
        events = outcome.events.len(),
        events_file = %config.events_file(),
        "checkout-sentinel finished"
    );
    Ok(())
}
