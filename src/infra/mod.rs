//! Infrastructure - configuration and run summary
//!
//! This module contains infrastructure concerns:
//! - `config` - Application configuration (TOML loading, defaults)
//! - `summary` - Per-stream and per-event counters for a run

pub mod config;
pub mod summary;

// Re-export commonly used types
pub use config::Config;
pub use summary::{RunSummary, StreamStats};
