//! Run summary: per-stream load counters and per-kind event counters
//!
//! Filled once during a run and logged at the end.

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::info;

/// Load outcome of a single input file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreamStats {
    /// False when the file did not exist
    pub present: bool,
    pub loaded: usize,
    /// Malformed lines or rows that were dropped
    pub skipped: usize,
}

impl StreamStats {
    pub fn missing() -> Self {
        Self::default()
    }
}

/// Counters for a whole detection run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    streams: IndexMap<&'static str, StreamStats>,
    events_by_id: FxHashMap<&'static str, u64>,
    events_total: u64,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_stream(&mut self, stream: &'static str, stats: StreamStats) {
        self.streams.insert(stream, stats);
    }

    pub fn record_event(&mut self, event_id: &'static str) {
        *self.events_by_id.entry(event_id).or_insert(0) += 1;
        self.events_total += 1;
    }

    pub fn stream(&self, stream: &str) -> Option<StreamStats> {
        self.streams.get(stream).copied()
    }

    pub fn events_for(&self, event_id: &str) -> u64 {
        self.events_by_id.get(event_id).copied().unwrap_or(0)
    }

    pub fn events_total(&self) -> u64 {
        self.events_total
    }

    pub fn records_skipped(&self) -> usize {
        self.streams.values().map(|s| s.skipped).sum()
    }

    /// Event counts sorted by event id
    pub fn event_counts(&self) -> Vec<(&'static str, u64)> {
        let mut counts: Vec<_> = self.events_by_id.iter().map(|(id, n)| (*id, *n)).collect();
        counts.sort_unstable_by_key(|(id, _)| *id);
        counts
    }

    /// Log the summary with structured fields
    pub fn log(&self) {
        for (stream, stats) in &self.streams {
            info!(
                stream = %stream,
                present = stats.present,
                loaded = stats.loaded,
                skipped = stats.skipped,
                "summary_stream"
            );
        }

        for (event_id, count) in self.event_counts() {
            info!(event_id = %event_id, count = count, "summary_events");
        }

        info!(
            events_total = self.events_total,
            records_skipped = self.records_skipped(),
            "summary_total"
        );
    }
}
