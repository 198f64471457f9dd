//! Fraud detectors
//!
//! Cross-checks POS scans against RFID reads, vision predictions and the
//! product catalog:
//! - Success operation (E000): clean scan confirmed by RFID and weight
//! - Scanner avoidance (E001): vision or RFID saw an item that was never scanned
//! - Barcode switching (E002): vision saw a different product than was scanned
//! - Weight discrepancy (E003): scale weight too far from catalog weight
//!
//! Every detector is a pure function of its inputs.

use crate::domain::catalog::Catalog;
use crate::domain::event::{DetectedEvent, EventKind};
use crate::domain::types::{PosTransaction, ProductRecognition, RfidReading};
use crate::infra::config::FraudConfig;
use crate::services::group_by_station;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

const UNKNOWN_CUSTOMER: &str = "UNKNOWN";

/// Percentage difference of an actual weight from a catalog weight
#[inline]
fn weight_diff_pct(actual: f64, expected: f64) -> f64 {
    (actual - expected).abs() / expected * 100.0
}

/// E000: successful scans confirmed by RFID at the same station and by weight
///
/// A scan without a catalog weight passes the weight check.
pub fn detect_success_operations(
    transactions: &[PosTransaction],
    readings: &[RfidReading],
    catalog: &Catalog,
    config: &FraudConfig,
) -> Vec<DetectedEvent> {
    let mut rfid_skus: FxHashMap<&str, FxHashSet<&str>> = FxHashMap::default();
    for reading in readings {
        rfid_skus.entry(reading.station_id.as_str()).or_default().insert(reading.sku.as_str());
    }

    transactions
        .iter()
        .filter(|tx| tx.is_success())
        .filter(|tx| {
            rfid_skus.get(tx.station_id.as_str()).is_some_and(|skus| skus.contains(tx.sku.as_str()))
        })
        .filter(|tx| match catalog.weight_of(&tx.sku) {
            Some(expected) => {
                weight_diff_pct(tx.weight_g, expected) <= config.success_weight_tolerance_pct
            }
            None => true,
        })
        .map(|tx| {
            DetectedEvent::new(
                tx.timestamp.as_str(),
                EventKind::SuccessOperation {
                    station_id: tx.station_id.clone(),
                    customer_id: tx.customer_id.clone(),
                    product_sku: tx.sku.clone(),
                },
            )
        })
        .collect()
}

/// E001 (primary): confident vision predictions with no matching scan nearby
///
/// A scan matches when it is at the same station, for the predicted SKU, and
/// within `[T - before, T + after]` of the prediction time T. The window is
/// asymmetric: a customer may scan shortly before the camera confirms, or the
/// camera may see the item well before the scan completes.
pub fn detect_scanner_avoidance_vision(
    predictions: &[ProductRecognition],
    transactions: &[PosTransaction],
    config: &FraudConfig,
) -> Vec<DetectedEvent> {
    let scans_by_station = group_by_station(transactions, |tx| &tx.station_id);
    let mut events = Vec::new();

    for prediction in predictions.iter().filter(|p| p.accuracy >= config.vision_confidence) {
        let matched = scans_by_station.get(prediction.station_id.as_str()).is_some_and(|scans| {
            scans.iter().any(|tx| {
                let offset = prediction.timestamp.seconds_until(&tx.timestamp);
                tx.sku == prediction.predicted_product
                    && offset >= -config.vision_window_before_secs
                    && offset <= config.vision_window_after_secs
            })
        });

        if !matched {
            debug!(
                station_id = %prediction.station_id,
                sku = %prediction.predicted_product,
                accuracy = prediction.accuracy,
                timestamp = %prediction.timestamp,
                "vision_item_not_scanned"
            );
            events.push(DetectedEvent::new(
                prediction.timestamp.as_str(),
                EventKind::ScannerAvoidance {
                    station_id: prediction.station_id.clone(),
                    customer_id: UNKNOWN_CUSTOMER.to_string(),
                    product_sku: prediction.predicted_product.clone(),
                },
            ));
        }
    }

    events
}

/// E001 (secondary): RFID-tagged items never scanned at the station
///
/// Reads without a SKU are ignored. The customer is the station's first POS
/// customer, or `UNKNOWN` when the station has no scans.
pub fn detect_scanner_avoidance_rfid(
    readings: &[RfidReading],
    transactions: &[PosTransaction],
) -> Vec<DetectedEvent> {
    let reads_by_station = group_by_station(readings, |r| &r.station_id);
    let scans_by_station = group_by_station(transactions, |tx| &tx.station_id);
    let mut events = Vec::new();

    for (station_id, reads) in &reads_by_station {
        let scans = scans_by_station.get(station_id).map(Vec::as_slice).unwrap_or_default();
        let scanned: FxHashSet<&str> = scans.iter().map(|tx| tx.sku.as_str()).collect();
        let customer_id =
            scans.first().map(|tx| tx.customer_id.as_str()).unwrap_or(UNKNOWN_CUSTOMER);

        for reading in reads.iter().filter(|r| !r.sku.is_empty()) {
            let sku = reading.sku.as_str();
            if !scanned.contains(sku) {
                events.push(DetectedEvent::new(
                    reading.timestamp.as_str(),
                    EventKind::ScannerAvoidance {
                        station_id: station_id.to_string(),
                        customer_id: customer_id.to_string(),
                        product_sku: sku.to_string(),
                    },
                ));
            }
        }
    }

    events
}

/// E002: confident vision predictions that disagree with the scanned SKU
///
/// Predictions and scans at a station are paired by list position: the
/// prediction at index i is compared with the scan at index i. Only
/// predictions at or above `switching_confidence` are compared, and the index
/// counts every prediction at the station.
pub fn detect_barcode_switching(
    transactions: &[PosTransaction],
    predictions: &[ProductRecognition],
    config: &FraudConfig,
) -> Vec<DetectedEvent> {
    let scans_by_station = group_by_station(transactions, |tx| &tx.station_id);
    let predictions_by_station = group_by_station(predictions, |p| &p.station_id);
    let mut events = Vec::new();

    for (station_id, station_predictions) in &predictions_by_station {
        let Some(scans) = scans_by_station.get(station_id) else {
            continue;
        };

        for (prediction, tx) in station_predictions.iter().zip(scans.iter()) {
            if prediction.accuracy < config.switching_confidence {
                continue;
            }
            if prediction.predicted_product != tx.sku {
                events.push(DetectedEvent::new(
                    tx.timestamp.as_str(),
                    EventKind::BarcodeSwitching {
                        station_id: station_id.to_string(),
                        customer_id: tx.customer_id.clone(),
                        actual_sku: prediction.predicted_product.clone(),
                        scanned_sku: tx.sku.clone(),
                    },
                ));
            }
        }
    }

    events
}

/// E003: scans whose weight differs from the catalog by more than the tolerance
pub fn detect_weight_discrepancies(
    transactions: &[PosTransaction],
    catalog: &Catalog,
    config: &FraudConfig,
) -> Vec<DetectedEvent> {
    transactions
        .iter()
        .filter_map(|tx| {
            let expected = catalog.weight_of(&tx.sku)?;
            let diff_pct = weight_diff_pct(tx.weight_g, expected);
            if diff_pct <= config.weight_tolerance_pct {
                return None;
            }

            debug!(
                station_id = %tx.station_id,
                sku = %tx.sku,
                expected_weight = expected,
                actual_weight = tx.weight_g,
                diff_pct = diff_pct,
                "weight_mismatch"
            );
            Some(DetectedEvent::new(
                tx.timestamp.as_str(),
                EventKind::WeightDiscrepancy {
                    station_id: tx.station_id.clone(),
                    customer_id: tx.customer_id.clone(),
                    product_sku: tx.sku.clone(),
                    expected_weight: expected,
                    actual_weight: tx.weight_g,
                },
            ))
        })
        .collect()
}
