pub mod loader;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use loader::{positive_hours, ConfigLoader};

pub const DEFAULT_WATCH_LABEL: &str = "nbs";
pub const DEFAULT_STATE_FILE: &str = ".review-monitor/state.json";

/// Policy thresholds. Every field is positive; see [`ConfigLoader`] for the
/// fallback rules applied to operator input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub stale_hours: f64,
    pub owner_ping_hours: f64,
    pub approved_reminder_hours: f64,
    pub approved_escalation_hours: f64,
    pub stable_terminal_hours: f64,
    pub stable_terminal_streak: u32,
    pub normal_interval_minutes: u32,
    pub downshift_interval_minutes: u32,
    pub unchanged_alerts_per_day: u32,
    pub skip_escalation_threshold: u32,
    pub merge_ready_streak: u32,
    pub report_lookback_hours: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            stale_hours: 24.0,
            owner_ping_hours: 72.0,
            approved_reminder_hours: 48.0,
            approved_escalation_hours: 96.0,
            stable_terminal_hours: 24.0,
            stable_terminal_streak: 3,
            normal_interval_minutes: 20,
            downshift_interval_minutes: 120,
            unchanged_alerts_per_day: 3,
            skip_escalation_threshold: 3,
            merge_ready_streak: 3,
            report_lookback_hours: 24.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// `owner/name` of the monitored repository.
    pub repo: Option<String>,
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub api_url: Option<String>,
    pub watch_label: String,
    pub state_file: PathBuf,
    /// PR that receives the audit-delta comment.
    pub audit_pr: Option<u64>,
    /// Issue that receives the stale-PR digest comment.
    pub digest_issue: Option<u64>,
    pub thresholds: Thresholds,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            repo: None,
            token: None,
            api_url: None,
            watch_label: DEFAULT_WATCH_LABEL.to_string(),
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
            audit_pr: None,
            digest_issue: None,
            thresholds: Thresholds::default(),
        }
    }
}
