//! Event egress - writes the detected event log to file
//!
//! Events are written in JSONL format (one JSON object per line) to the file
//! given on the command line or in config. Each run replaces the file.

use crate::domain::event::DetectedEvent;
use anyhow::Context;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

/// Egress writer for detected events
pub struct EventWriter {
    file_path: String,
}

impl EventWriter {
    pub fn new(file_path: &str) -> Self {
        info!(file_path = %file_path, "egress_initialized");
        Self { file_path: file_path.to_string() }
    }

    /// Write events in the given order, replacing any existing file
    ///
    /// Returns the number of lines written. Any I/O failure is fatal for the
    /// run and is returned with the file path attached.
    pub fn write_events(&self, events: &[DetectedEvent]) -> anyhow::Result<usize> {
        let path = Path::new(&self.file_path);

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create output directory {}", parent.display())
                })?;
            }
        }

        let file = File::create(path)
            .with_context(|| format!("Failed to create output file {}", self.file_path))?;
        let mut writer = BufWriter::new(file);

        for event in events {
            let line = event
                .to_json()
                .with_context(|| format!("Failed to encode {} event", event.event_id()))?;
            writeln!(writer, "{}", line)
                .with_context(|| format!("Failed to write to {}", self.file_path))?;
            debug!(
                event_id = %event.event_id(),
                station_id = ?event.kind.station_id(),
                timestamp = %event.timestamp,
                "event_written"
            );
        }
        writer.flush().with_context(|| format!("Failed to flush {}", self.file_path))?;

        info!(file = %self.file_path, events = events.len(), "events_written");
        Ok(events.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::{EventKind, EventRecord, StaffType};
    use std::fs;
    use tempfile::tempdir;

    fn long_queue(ts: &str, customers: u32) -> DetectedEvent {
        DetectedEvent::new(
            ts,
            EventKind::LongQueue { station_id: "SCC1".to_string(), num_of_customers: customers },
        )
    }

    #[test]
    fn test_write_events() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("events.jsonl");
        let writer = EventWriter::new(file_path.to_str().unwrap());

        let events = vec![
            long_queue("2025-08-13T16:00:00", 6),
            DetectedEvent::new(
                "2025-08-13T16:00:05",
                EventKind::StaffingNeeds {
                    station_id: "SCC1".to_string(),
                    staff_type: StaffType::Cashier,
                },
            ),
        ];
        assert_eq!(writer.write_events(&events).unwrap(), 2);

        let content = fs::read_to_string(&file_path).unwrap();
        assert!(content.ends_with('\n'));
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed["event_id"], "E005");
        assert_eq!(parsed["event_data"]["num_of_customers"], 6);

        let record = EventRecord::from_json_line(lines[1]).unwrap();
        assert_eq!(record, events[1].to_record());
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let nested_path = dir.path().join("nested").join("dir").join("events.jsonl");
        let writer = EventWriter::new(nested_path.to_str().unwrap());

        writer.write_events(&[long_queue("2025-08-13T16:00:00", 6)]).unwrap();
        assert!(nested_path.exists());
    }

    #[test]
    fn test_truncates_existing_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("events.jsonl");

        // Pre-create file with content from an earlier run
        fs::write(&file_path, "{\"existing\":\"data\"}\n{\"more\":1}\n").unwrap();

        let writer = EventWriter::new(file_path.to_str().unwrap());
        writer.write_events(&[long_queue("2025-08-13T16:00:00", 7)]).unwrap();

        let content = fs::read_to_string(&file_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 1);
        assert!(!content.contains("existing"));
    }

    #[test]
    fn test_empty_log_creates_empty_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("events.jsonl");
        let writer = EventWriter::new(file_path.to_str().unwrap());

        assert_eq!(writer.write_events(&[]).unwrap(), 0);
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "");
    }

    #[test]
    fn test_unwritable_path_is_an_error() {
        let dir = tempdir().unwrap();
        // A directory cannot be opened as the output file
        let writer = EventWriter::new(dir.path().to_str().unwrap());
        assert!(writer.write_events(&[long_queue("2025-08-13T16:00:00", 6)]).is_err());
    }
}
