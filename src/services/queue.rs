//! Queue detectors
//!
//! Turn queue monitoring samples into queue events:
//! - Long queue (E005) and long wait (E006) per sample
//! - Staffing needs (E008) with Cashier/Manager escalation
//! - Station open/close recommendation (E009) from the latest sample
//!
//! Queue trends are computed for the analytics report only.

use crate::domain::event::{DetectedEvent, EventKind, StaffType, StationAction};
use crate::domain::types::QueueSample;
use crate::infra::config::QueueConfig;
use crate::services::group_by_station;
use serde::Serialize;
use tracing::debug;

/// E005: samples with more customers than the long-queue threshold
pub fn detect_long_queues(samples: &[QueueSample], config: &QueueConfig) -> Vec<DetectedEvent> {
    samples
        .iter()
        .filter(|s| s.customer_count > config.long_queue_customers)
        .map(|s| {
            DetectedEvent::new(
                s.timestamp.as_str(),
                EventKind::LongQueue {
                    station_id: s.station_id.clone(),
                    num_of_customers: s.customer_count,
                },
            )
        })
        .collect()
}

/// E006: samples whose average dwell time exceeds the wait threshold
pub fn detect_long_waits(samples: &[QueueSample], config: &QueueConfig) -> Vec<DetectedEvent> {
    samples
        .iter()
        .filter(|s| s.average_dwell_time > config.long_wait_secs)
        .map(|s| {
            DetectedEvent::new(
                s.timestamp.as_str(),
                EventKind::LongWait {
                    station_id: s.station_id.clone(),
                    wait_time_seconds: s.average_dwell_time,
                },
            )
        })
        .collect()
}

/// Staff level needed for a sample, if any
fn staffing_for(sample: &QueueSample, config: &QueueConfig) -> Option<StaffType> {
    let busy = sample.customer_count >= config.staffing_customers
        || sample.average_dwell_time >= config.staffing_wait_secs;
    if !busy {
        return None;
    }

    let manager_at = f64::from(config.staffing_customers) * config.manager_multiplier;
    if f64::from(sample.customer_count) >= manager_at {
        Some(StaffType::Manager)
    } else {
        Some(StaffType::Cashier)
    }
}

/// E008: one event per sample that needs extra staff
pub fn predict_staffing_needs(
    samples: &[QueueSample],
    config: &QueueConfig,
) -> Vec<DetectedEvent> {
    samples
        .iter()
        .filter_map(|s| {
            let staff_type = staffing_for(s, config)?;
            Some(DetectedEvent::new(
                s.timestamp.as_str(),
                EventKind::StaffingNeeds { station_id: s.station_id.clone(), staff_type },
            ))
        })
        .collect()
}

/// E009: at most one recommendation per station, from its latest sample
///
/// Stations are visited in order of first appearance. `Close` needs a full
/// trailing window of quiet samples, so a station with too little history is
/// never closed.
pub fn recommend_station_actions(
    samples: &[QueueSample],
    config: &QueueConfig,
) -> Vec<DetectedEvent> {
    let mut events = Vec::new();

    for (station_id, history) in group_by_station(samples, |s| &s.station_id) {
        let Some(latest) = history.last() else {
            continue;
        };

        let action = if latest.customer_count >= config.open_customers {
            Some(StationAction::Open)
        } else if latest.customer_count <= config.close_customers
            && config.close_window > 0
            && history.len() >= config.close_window
        {
            let window = &history[history.len() - config.close_window..];
            let mean = window.iter().map(|s| f64::from(s.customer_count)).sum::<f64>()
                / window.len() as f64;
            (mean <= f64::from(config.close_customers)).then_some(StationAction::Close)
        } else {
            None
        };

        if let Some(action) = action {
            debug!(
                station_id = %station_id,
                customers = latest.customer_count,
                action = action.as_str(),
                "station_action"
            );
            events.push(DetectedEvent::new(
                latest.timestamp.as_str(),
                EventKind::StationAction { station_id: station_id.to_string(), action },
            ));
        }
    }

    events
}

/// Per-station queue statistics for the analytics report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueTrend {
    pub station_id: String,
    pub samples: usize,
    pub avg_customers: f64,
    pub max_customers: u32,
    pub avg_dwell_time: f64,
    pub max_dwell_time: f64,
}

/// Queue statistics per station, in order of first appearance
pub fn analyze_queue_trends(samples: &[QueueSample]) -> Vec<QueueTrend> {
    group_by_station(samples, |s| &s.station_id)
        .into_iter()
        .map(|(station_id, history)| {
            let n = history.len() as f64;
            QueueTrend {
                station_id: station_id.to_string(),
                samples: history.len(),
                avg_customers: history.iter().map(|s| f64::from(s.customer_count)).sum::<f64>()
                    / n,
                max_customers: history.iter().map(|s| s.customer_count).max().unwrap_or(0),
                avg_dwell_time: history.iter().map(|s| s.average_dwell_time).sum::<f64>() / n,
                max_dwell_time: history.iter().map(|s| s.average_dwell_time).fold(0.0, f64::max),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Timestamp;

    fn sample(time: &str, station: &str, customers: u32, dwell: f64) -> QueueSample {
        QueueSample {
            timestamp: Timestamp::parse(time).unwrap(),
            station_id: station.to_string(),
            customer_count: customers,
            average_dwell_time: dwell,
        }
    }

    #[test]
    fn test_long_queue_threshold() {
        let samples = [
            sample("2025-08-13T16:00:00", "SCC1", 5, 10.0),
            sample("2025-08-13T16:00:05", "SCC1", 6, 10.0),
        ];
        let events = detect_long_queues(&samples, &QueueConfig::default());
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].kind,
            EventKind::LongQueue { station_id: "SCC1".to_string(), num_of_customers: 6 }
        );
    }

    #[test]
    fn test_long_wait_threshold() {
        let samples = [
            sample("2025-08-13T16:00:00", "SCC1", 1, 300.0),
            sample("2025-08-13T16:00:05", "SCC1", 1, 301.9),
        ];
        let events = detect_long_waits(&samples, &QueueConfig::default());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].timestamp, "2025-08-13T16:00:05");
        assert_eq!(events[0].to_record().event_data["wait_time_seconds"], 301);
    }

    #[test]
    fn test_staffing_escalation() {
        let config = QueueConfig::default();
        let samples = [
            sample("2025-08-13T16:00:00", "SCC1", 4, 100.0), // quiet
            sample("2025-08-13T16:00:05", "SCC1", 5, 100.0), // cashier
            sample("2025-08-13T16:00:10", "SCC1", 7, 100.0), // still cashier
            sample("2025-08-13T16:00:15", "SCC1", 8, 100.0), // manager
            sample("2025-08-13T16:00:20", "SCC1", 1, 300.0), // slow, cashier
        ];

        let staff: Vec<StaffType> = predict_staffing_needs(&samples, &config)
            .into_iter()
            .map(|e| match e.kind {
                EventKind::StaffingNeeds { staff_type, .. } => staff_type,
                other => panic!("Expected StaffingNeeds, got {other:?}"),
            })
            .collect();
        assert_eq!(
            staff,
            vec![StaffType::Cashier, StaffType::Cashier, StaffType::Manager, StaffType::Cashier]
        );
    }

    #[test]
    fn test_station_open_uses_latest_sample() {
        let samples = [
            sample("2025-08-13T16:00:00", "SCC1", 9, 10.0),
            sample("2025-08-13T16:00:05", "SCC2", 6, 10.0),
            sample("2025-08-13T16:00:10", "SCC1", 3, 10.0),
        ];
        let events = recommend_station_actions(&samples, &QueueConfig::default());

        // SCC1 latest has 3 customers: neither open nor close
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].kind,
            EventKind::StationAction { station_id: "SCC2".to_string(), action: StationAction::Open }
        );
    }

    #[test]
    fn test_station_close_needs_full_quiet_window() {
        let config = QueueConfig::default();

        let short = [
            sample("2025-08-13T16:00:00", "SCC1", 0, 10.0),
            sample("2025-08-13T16:00:05", "SCC1", 0, 10.0),
        ];
        assert!(recommend_station_actions(&short, &config).is_empty());

        let quiet = [
            sample("2025-08-13T16:00:00", "SCC1", 9, 10.0),
            sample("2025-08-13T16:00:05", "SCC1", 2, 10.0),
            sample("2025-08-13T16:00:10", "SCC1", 3, 10.0),
            sample("2025-08-13T16:00:15", "SCC1", 1, 10.0),
        ];
        let events = recommend_station_actions(&quiet, &config);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].timestamp, "2025-08-13T16:00:15");
        assert_eq!(
            events[0].kind,
            EventKind::StationAction {
                station_id: "SCC1".to_string(),
                action: StationAction::Close
            }
        );

        let busy_tail = [
            sample("2025-08-13T16:00:00", "SCC1", 4, 10.0),
            sample("2025-08-13T16:00:05", "SCC1", 4, 10.0),
            sample("2025-08-13T16:00:10", "SCC1", 1, 10.0),
        ];
        assert!(recommend_station_actions(&busy_tail, &config).is_empty());
    }

    #[test]
    fn test_queue_trends() {
        let samples = [
            sample("2025-08-13T16:00:00", "SCC1", 2, 60.0),
            sample("2025-08-13T16:00:05", "SCC2", 5, 10.0),
            sample("2025-08-13T16:00:10", "SCC1", 4, 120.0),
        ];
        let trends = analyze_queue_trends(&samples);

        assert_eq!(trends.len(), 2);
        assert_eq!(trends[0].station_id, "SCC1");
        assert_eq!(trends[0].samples, 2);
        assert_eq!(trends[0].avg_customers, 3.0);
        assert_eq!(trends[0].max_customers, 4);
        assert_eq!(trends[0].avg_dwell_time, 90.0);
        assert_eq!(trends[0].max_dwell_time, 120.0);
        assert_eq!(trends[1].station_id, "SCC2");
    }
}
