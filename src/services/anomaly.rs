//! Anomaly detectors
//!
//! `detect_system_crashes` emits E004 events from gaps in a station's
//! activity. The other functions are diagnostics over numeric series and
//! transactions; their findings go to the analytics report.

use crate::domain::event::{DetectedEvent, EventKind};
use crate::domain::types::{PosTransaction, QueueSample, RfidReading, Timestamp};
use crate::infra::config::AnomalyConfig;
use chrono::Timelike;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

const PATTERN_WINDOW: usize = 3;
const MIN_SERIES_LEN: usize = 3;
const EARLY_HOUR: u32 = 6;
const BEHAVIOR_FLAG_SCORE: u32 = 2;
const CORRELATION_MIN_CHANGE: f64 = 0.1;

/// E004: silent periods in a station's combined POS, RFID and queue activity
///
/// Records are merged per station and ordered by time (ties keep input
/// order). A gap between consecutive records becomes a crash when it reaches
/// both the gap and the duration minimum. The event is stamped with the
/// record before the gap. Records without a station are ignored.
pub fn detect_system_crashes(
    transactions: &[PosTransaction],
    readings: &[RfidReading],
    samples: &[QueueSample],
    config: &AnomalyConfig,
) -> Vec<DetectedEvent> {
    let mut timeline: Vec<(&Timestamp, &str)> = transactions
        .iter()
        .map(|tx| (&tx.timestamp, tx.station_id.as_str()))
        .chain(readings.iter().map(|r| (&r.timestamp, r.station_id.as_str())))
        .chain(samples.iter().map(|s| (&s.timestamp, s.station_id.as_str())))
        .filter(|(_, station_id)| !station_id.is_empty())
        .collect();
    timeline.sort_by_key(|(ts, _)| ts.at());

    let mut by_station: IndexMap<&str, Vec<&Timestamp>> = IndexMap::new();
    for (ts, station_id) in timeline {
        by_station.entry(station_id).or_default().push(ts);
    }

    let mut events = Vec::new();
    for (station_id, stamps) in &by_station {
        for pair in stamps.windows(2) {
            let gap = pair[0].seconds_until(pair[1]);
            let duration = gap as u64;
            if gap >= config.crash_min_gap_secs && duration >= config.crash_min_duration_secs {
                debug!(
                    station_id = %station_id,
                    from = %pair[0],
                    to = %pair[1],
                    duration_seconds = duration,
                    "station_silent"
                );
                events.push(DetectedEvent::new(
                    pair[0].as_str(),
                    EventKind::SystemCrash {
                        station_id: station_id.to_string(),
                        duration_seconds: duration,
                    },
                ));
            }
        }
    }

    events
}

/// Indices of values more than `threshold` population standard deviations
/// from the mean
///
/// Series shorter than three values, or without spread, have no outliers.
pub fn statistical_outliers(values: &[f64], threshold: f64) -> Vec<usize> {
    if values.len() < MIN_SERIES_LEN {
        return Vec::new();
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();
    if std_dev == 0.0 {
        return Vec::new();
    }

    values
        .iter()
        .enumerate()
        .filter(|(_, v)| ((*v - mean) / std_dev).abs() > threshold)
        .map(|(i, _)| i)
        .collect()
}

/// Point that strays from the average of the values before it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternAnomaly {
    pub timestamp: String,
    pub value: f64,
    pub expected: f64,
    /// Relative deviation from `expected`, in percent
    pub deviation: f64,
}

/// Compare each point with the moving average of the three points before it
///
/// Points whose moving average is zero or negative are not judged.
pub fn pattern_anomalies(series: &[(String, f64)], max_deviation: f64) -> Vec<PatternAnomaly> {
    if series.len() < MIN_SERIES_LEN {
        return Vec::new();
    }

    (PATTERN_WINDOW..series.len())
        .filter_map(|i| {
            let window = &series[i - PATTERN_WINDOW..i];
            let moving_avg =
                window.iter().map(|(_, v)| v).sum::<f64>() / PATTERN_WINDOW as f64;
            if moving_avg <= 0.0 {
                return None;
            }

            let (timestamp, value) = &series[i];
            let deviation = (value - moving_avg).abs() / moving_avg;
            (deviation > max_deviation).then(|| PatternAnomaly {
                timestamp: timestamp.clone(),
                value: *value,
                expected: moving_avg,
                deviation: deviation * 100.0,
            })
        })
        .collect()
}

/// Expected price range for behavioral scoring
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BehaviorBaseline {
    pub min_price: f64,
    pub max_price: f64,
}

impl Default for BehaviorBaseline {
    fn default() -> Self {
        Self { min_price: 0.0, max_price: 999_999.0 }
    }
}

impl BehaviorBaseline {
    /// Price range spanned by a set of catalog prices, or the default range
    /// when there are none
    pub fn from_prices(prices: impl IntoIterator<Item = f64>) -> Self {
        prices
            .into_iter()
            .fold(None, |range: Option<Self>, price| {
                Some(match range {
                    Some(r) => Self {
                        min_price: r.min_price.min(price),
                        max_price: r.max_price.max(price),
                    },
                    None => Self { min_price: price, max_price: price },
                })
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorFactor {
    UnusuallyLowPrice,
    UnusuallyHighPrice,
    ZeroWeight,
    UnusualHour,
}

/// Transaction that scored as unusual
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BehavioralAnomaly {
    pub timestamp: String,
    pub station_id: String,
    pub customer_id: String,
    pub sku: String,
    pub anomaly_score: u32,
    pub factors: Vec<BehaviorFactor>,
}

/// Score each transaction and keep those scoring two or more
///
/// Price outside the baseline range adds 1, a zero weight adds 2 and a scan
/// before 06:00 adds 1.
pub fn behavioral_anomalies(
    transactions: &[PosTransaction],
    baseline: &BehaviorBaseline,
) -> Vec<BehavioralAnomaly> {
    transactions
        .iter()
        .filter_map(|tx| {
            let mut factors = Vec::new();
            let mut score = 0;

            if tx.price < baseline.min_price {
                score += 1;
                factors.push(BehaviorFactor::UnusuallyLowPrice);
            } else if tx.price > baseline.max_price {
                score += 1;
                factors.push(BehaviorFactor::UnusuallyHighPrice);
            }
            if tx.weight_g == 0.0 {
                score += 2;
                factors.push(BehaviorFactor::ZeroWeight);
            }
            if tx.timestamp.at().hour() < EARLY_HOUR {
                score += 1;
                factors.push(BehaviorFactor::UnusualHour);
            }

            (score >= BEHAVIOR_FLAG_SCORE).then(|| BehavioralAnomaly {
                timestamp: tx.timestamp.as_str().to_string(),
                station_id: tx.station_id.clone(),
                customer_id: tx.customer_id.clone(),
                sku: tx.sku.clone(),
                anomaly_score: score,
                factors,
            })
        })
        .collect()
}

/// How two series are expected to move together
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correlation {
    Positive,
    Negative,
}

/// Steps where two series move against their expected relation
///
/// Only steps where at least one series changes by more than 10% of its
/// previous value count. Series of different length, or shorter than three,
/// yield nothing.
pub fn correlation_breaks(first: &[f64], second: &[f64], expected: Correlation) -> Vec<usize> {
    if first.len() != second.len() || first.len() < MIN_SERIES_LEN {
        return Vec::new();
    }

    (1..first.len())
        .filter(|&i| {
            let change1 = first[i] - first[i - 1];
            let change2 = second[i] - second[i - 1];
            let contradicts = match expected {
                Correlation::Positive => {
                    (change1 > 0.0 && change2 < 0.0) || (change1 < 0.0 && change2 > 0.0)
                }
                Correlation::Negative => {
                    (change1 > 0.0 && change2 > 0.0) || (change1 < 0.0 && change2 < 0.0)
                }
            };
            contradicts
                && (change1.abs() > CORRELATION_MIN_CHANGE * first[i - 1].abs()
                    || change2.abs() > CORRELATION_MIN_CHANGE * second[i - 1].abs())
        })
        .collect()
}
