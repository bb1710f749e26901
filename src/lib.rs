pub mod classification;
pub mod config;
pub mod error;
pub mod github;
pub mod monitor;
pub mod policy;
pub mod report;
pub mod state;

pub use error::MonitorError;
pub use monitor::{ReviewMonitor, ScanOptions, ScanOutcome};
