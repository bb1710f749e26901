//! Presentation of snapshots and run history.

pub mod aggregate;
pub mod render;

pub use aggregate::RunReport;
pub use render::{build_audit_delta_comment, build_digest_comment, build_skip_summary, summarize};
