//! End-to-end tests: input directory in, event log out

use checkout_sentinel::domain::EventRecord;
use checkout_sentinel::infra::Config;
use checkout_sentinel::services::Pipeline;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const PRODUCTS: &str = "\
SKU,product_name,quantity,EPC_range,barcode,weight,price
PRD_A,Full Cream Milk,100,E200-E299,4792024011348,500,300
PRD_B,White Bread,50,E300-E399,4792024011355,200,150
";

const CUSTOMERS: &str = "\
Customer_ID,Name,Age,Address,TP
C001,Nimal Perera,34,Colombo,0771234567
";

const POS: &str = r#"{"timestamp":"2025-08-13T16:00:00","station_id":"SCC1","status":"Success","data":{"customer_id":"C001","sku":"PRD_A","product_name":"Full Cream Milk","barcode":"4792024011348","price":300,"weight_g":510}}
{"timestamp":"2025-08-13T16:00:20","station_id":"SCC1","status":"Active","data":{"customer_id":"C001","sku":"PRD_A","product_name":"Full Cream Milk","barcode":4792024011348,"price":300,"weight_g":600}}
not a json line
{"timestamp":"2025-08-13T16:03:00","station_id":"SCC1","status":"Active","data":{"customer_id":"C001","sku":"PRD_B","product_name":"White Bread","barcode":"4792024011355","price":150,"weight_g":200}}
"#;

const RFID: &str = r#"{"timestamp":"2025-08-13T16:00:01","station_id":"SCC1","status":"Active","data":{"epc":"E250","location":"IN_SCAN_AREA","sku":"PRD_A"}}
{"timestamp":"2025-08-13T16:00:03","station_id":"SCC1","status":"Active","data":{"epc":"E900","location":"IN_SCAN_AREA","sku":"PRD_C"}}
"#;

const RECOGNITION: &str = r#"{"timestamp":"2025-08-13T16:00:00","station_id":"SCC1","status":"Active","data":{"predicted_product":"PRD_A","accuracy":0.95}}
{"timestamp":"2025-08-13T16:00:21","station_id":"SCC1","status":"Active","data":{"predicted_product":"PRD_B","accuracy":0.9}}
"#;

const QUEUE: &str = r#"{"timestamp":"2025-08-13T16:00:10","station_id":"SCC2","status":"Active","data":{"customer_count":6,"average_dwell_time":350.0}}
{"timestamp":"2025-08-13T16:00:40","station_id":"SCC2","status":"Active","data":{"customer_count":2,"average_dwell_time":60.0}}
{"timestamp":"2025-08-13T16:01:10","station_id":"SCC2","status":"Active","data":{"customer_count":1,"average_dwell_time":40.0}}
{"timestamp":"2025-08-13T16:01:40","station_id":"SCC2","status":"Active","data":{"customer_count":0,"average_dwell_time":0.0}}
"#;

const INVENTORY: &str = r#"{"timestamp":"2025-08-13T18:00:00","data":{"PRD_A":90,"PRD_B":49}}
{"timestamp":"2025-08-13T16:00:00","data":{"PRD_A":100,"PRD_B":50}}
"#;

fn write_inputs(dir: &Path) {
    fs::write(dir.join("products_list.csv"), PRODUCTS).unwrap();
    fs::write(dir.join("customer_data.csv"), CUSTOMERS).unwrap();
    fs::write(dir.join("pos_transactions.jsonl"), POS).unwrap();
    fs::write(dir.join("rfid_readings.jsonl"), RFID).unwrap();
    fs::write(dir.join("product_recognition.jsonl"), RECOGNITION).unwrap();
    fs::write(dir.join("queue_monitoring.jsonl"), QUEUE).unwrap();
    fs::write(dir.join("inventory_snapshots.jsonl"), INVENTORY).unwrap();
}

fn read_events(path: &Path) -> Vec<EventRecord> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| EventRecord::from_json_line(line).unwrap())
        .collect()
}

#[test]
fn test_full_run_writes_sorted_event_log() {
    let input = tempdir().unwrap();
    write_inputs(input.path());
    let output = tempdir().unwrap();
    let events_path = output.path().join("out").join("events.jsonl");
    let report_path = output.path().join("report.json");

    let config = Config::default()
        .with_data_dir(input.path().to_str().unwrap())
        .with_events_file(events_path.to_str().unwrap());
    let outcome = Pipeline::new(&config).run(Some(report_path.to_str().unwrap())).unwrap();

    let records = read_events(&events_path);
    let got: Vec<(&str, &str)> =
        records.iter().map(|r| (r.timestamp.as_str(), r.event_id.as_str())).collect();
    assert_eq!(
        got,
        vec![
            ("2025-08-13T16:00:00", "E000"),
            ("2025-08-13T16:00:03", "E001"),
            ("2025-08-13T16:00:10", "E005"),
            ("2025-08-13T16:00:10", "E006"),
            ("2025-08-13T16:00:10", "E008"),
            ("2025-08-13T16:00:20", "E002"),
            ("2025-08-13T16:00:20", "E003"),
            ("2025-08-13T16:00:20", "E004"),
            ("2025-08-13T16:00:21", "E001"),
            ("2025-08-13T16:01:40", "E009"),
            ("2025-08-13T18:00:00", "E007"),
        ]
    );

    // Written lines match the in-memory events exactly
    assert_eq!(records.len(), outcome.events.len());
    for (record, event) in records.iter().zip(&outcome.events) {
        assert_eq!(record, &event.to_record());
    }

    assert_eq!(records[1].event_data["product_sku"], "PRD_C");
    assert_eq!(records[1].event_data["customer_id"], "C001");
    assert_eq!(records[3].event_data["wait_time_seconds"], 350);
    assert_eq!(records[4].event_data["Staff_type"], "Cashier");
    assert_eq!(records[5].event_data["actual_sku"], "PRD_B");
    assert_eq!(records[5].event_data["scanned_sku"], "PRD_A");
    assert_eq!(records[6].event_data["expected_weight"], 500);
    assert_eq!(records[6].event_data["actual_weight"], 600);
    assert_eq!(records[7].event_data["duration_seconds"], 160);
    assert_eq!(records[8].event_data["customer_id"], "UNKNOWN");
    assert_eq!(records[9].event_data["Action"], "Close");
    assert_eq!(records[10].event_data["SKU"], "PRD_A");
    assert_eq!(records[10].event_data["Expected_Inventory"], 98);
    assert_eq!(records[10].event_data["Actual_Inventory"], 90);

    // Malformed POS line was skipped and counted
    let pos = outcome.summary.stream("pos").unwrap();
    assert_eq!(pos.loaded, 3);
    assert_eq!(pos.skipped, 1);
    assert_eq!(outcome.summary.events_for("E001"), 2);
    assert_eq!(outcome.summary.events_total(), 11);

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(report["queue_trends"][0]["station_id"], "SCC2");
    assert_eq!(report["velocity"][0]["sku"], "PRD_A");
    assert_eq!(report["velocity"][0]["sold_units"], 2);
    assert_eq!(report["shrinkage"][0]["sku"], "PRD_A");
    assert_eq!(report["shrinkage"][0]["unexplained_loss"], 8);
    assert_eq!(report["shrinkage"][0]["severity"], "high");
}

#[test]
fn test_rerun_replaces_previous_log() {
    let input = tempdir().unwrap();
    write_inputs(input.path());
    let output = tempdir().unwrap();
    let events_path = output.path().join("events.jsonl");

    let config = Config::default()
        .with_data_dir(input.path().to_str().unwrap())
        .with_events_file(events_path.to_str().unwrap());
    Pipeline::new(&config).run(None).unwrap();
    Pipeline::new(&config).run(None).unwrap();

    assert_eq!(read_events(&events_path).len(), 11);
}

#[test]
fn test_missing_streams_disable_their_detectors() {
    let input = tempdir().unwrap();
    fs::write(input.path().join("products_list.csv"), PRODUCTS).unwrap();
    fs::write(input.path().join("pos_transactions.jsonl"), POS).unwrap();
    let output = tempdir().unwrap();
    let events_path = output.path().join("events.jsonl");

    let config = Config::default()
        .with_data_dir(input.path().to_str().unwrap())
        .with_events_file(events_path.to_str().unwrap());
    let outcome = Pipeline::new(&config).run(None).unwrap();

    // Only weight checks and downtime can run on POS plus catalog
    let ids: Vec<String> = read_events(&events_path).into_iter().map(|r| r.event_id).collect();
    assert_eq!(ids, vec!["E003", "E004"]);
    assert!(!outcome.summary.stream("rfid").unwrap().present);
}

#[test]
fn test_missing_data_directory_aborts_before_writing() {
    let output = tempdir().unwrap();
    let events_path = output.path().join("events.jsonl");

    let config = Config::default()
        .with_data_dir("/nonexistent/checkout-sentinel/input")
        .with_events_file(events_path.to_str().unwrap());

    assert!(Pipeline::new(&config).run(None).is_err());
    assert!(!events_path.exists());
}

#[test]
fn test_empty_directory_writes_empty_log() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    let events_path = output.path().join("events.jsonl");

    let config = Config::default()
        .with_data_dir(input.path().to_str().unwrap())
        .with_events_file(events_path.to_str().unwrap());
    let outcome = Pipeline::new(&config).run(None).unwrap();

    assert!(outcome.events.is_empty());
    assert_eq!(fs::read_to_string(&events_path).unwrap(), "");
}
