//! Persisted monitor state: snapshots, the whole document and its store.

pub mod document;
pub mod snapshot;
pub mod store;

pub use document::{MonitorState, MAX_RUNS};
pub use snapshot::{count_keys, metric_keys, Counts, Signal, Snapshot};
pub use store::{JsonFileStore, StateStore};
