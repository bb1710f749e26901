//! Configuration loader
//!
//! Layers, lowest priority first: built-in defaults, an optional TOML file,
//! `REVIEW_MONITOR_*` environment variables. CLI flags are applied on top by
//! the binary. Threshold values that fail to parse or are not positive fall
//! back to their default with a warning instead of failing the scan.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::{MonitorConfig, Thresholds};
use crate::error::{MonitorError, Result};

pub const ENV_REPO: &str = "REVIEW_MONITOR_REPO";
pub const ENV_TOKEN: &str = "GITHUB_TOKEN";
pub const ENV_API_URL: &str = "REVIEW_MONITOR_API_URL";
pub const ENV_WATCH_LABEL: &str = "REVIEW_MONITOR_WATCH_LABEL";
pub const ENV_STATE_FILE: &str = "REVIEW_MONITOR_STATE_FILE";
pub const ENV_AUDIT_PR: &str = "REVIEW_MONITOR_AUDIT_PR";
pub const ENV_DIGEST_ISSUE: &str = "REVIEW_MONITOR_DIGEST_ISSUE";

const ENV_STALE_HOURS: &str = "REVIEW_MONITOR_STALE_HOURS";
const ENV_OWNER_PING_HOURS: &str = "REVIEW_MONITOR_OWNER_PING_HOURS";
const ENV_APPROVED_REMINDER_HOURS: &str = "REVIEW_MONITOR_APPROVED_REMINDER_HOURS";
const ENV_APPROVED_ESCALATION_HOURS: &str = "REVIEW_MONITOR_APPROVED_ESCALATION_HOURS";
const ENV_STABLE_TERMINAL_HOURS: &str = "REVIEW_MONITOR_STABLE_TERMINAL_HOURS";
const ENV_STABLE_TERMINAL_STREAK: &str = "REVIEW_MONITOR_STABLE_TERMINAL_STREAK";
const ENV_POLL_MINUTES: &str = "REVIEW_MONITOR_POLL_MINUTES";
const ENV_DOWNSHIFT_MINUTES: &str = "REVIEW_MONITOR_DOWNSHIFT_MINUTES";
const ENV_UNCHANGED_ALERTS: &str = "REVIEW_MONITOR_UNCHANGED_ALERTS_PER_DAY";
const ENV_SKIP_ESCALATION: &str = "REVIEW_MONITOR_SKIP_ESCALATION";
const ENV_MERGE_READY_STREAK: &str = "REVIEW_MONITOR_MERGE_READY_STREAK";
const ENV_REPORT_LOOKBACK_HOURS: &str = "REVIEW_MONITOR_REPORT_LOOKBACK_HOURS";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    repo: Option<String>,
    api_url: Option<String>,
    watch_label: Option<String>,
    state_file: Option<PathBuf>,
    audit_pr: Option<u64>,
    digest_issue: Option<u64>,
    thresholds: ThresholdOverrides,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ThresholdOverrides {
    stale_hours: Option<f64>,
    owner_ping_hours: Option<f64>,
    approved_reminder_hours: Option<f64>,
    approved_escalation_hours: Option<f64>,
    stable_terminal_hours: Option<f64>,
    stable_terminal_streak: Option<i64>,
    normal_interval_minutes: Option<i64>,
    downshift_interval_minutes: Option<i64>,
    unchanged_alerts_per_day: Option<i64>,
    skip_escalation_threshold: Option<i64>,
    merge_ready_streak: Option<i64>,
    report_lookback_hours: Option<f64>,
}

fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

pub struct ConfigLoader<F> {
    env: F,
}

impl ConfigLoader<fn(&str) -> Option<String>> {
    pub fn from_process_env() -> Self {
        Self { env: process_env }
    }
}

impl<F> ConfigLoader<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Use a custom environment lookup (tests pass a map here).
    pub fn with_env(env: F) -> Self {
        Self { env }
    }

    pub fn load(&self, file: Option<&Path>) -> Result<MonitorConfig> {
        let from_file = match file {
            Some(path) => Self::read_file(path)?,
            None => ConfigFile::default(),
        };

        let defaults = MonitorConfig::default();
        let env_text = |key: &str| self.env_value(key);

        let config = MonitorConfig {
            repo: env_text(ENV_REPO).or(from_file.repo),
            token: env_text(ENV_TOKEN),
            api_url: env_text(ENV_API_URL).or(from_file.api_url),
            watch_label: env_text(ENV_WATCH_LABEL)
                .or(from_file.watch_label)
                .unwrap_or(defaults.watch_label),
            state_file: env_text(ENV_STATE_FILE)
                .map(PathBuf::from)
                .or(from_file.state_file)
                .unwrap_or(defaults.state_file),
            audit_pr: self.item_number(ENV_AUDIT_PR, from_file.audit_pr),
            digest_issue: self.item_number(ENV_DIGEST_ISSUE, from_file.digest_issue),
            thresholds: self.thresholds(&from_file.thresholds),
        };

        info!(
            "Configuration resolved (repo: {}, watch label: {}, state file: {:?})",
            config.repo.as_deref().unwrap_or("<unset>"),
            config.watch_label,
            config.state_file
        );
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<ConfigFile> {
        if !path.exists() {
            warn!("Configuration file {:?} not found, using defaults", path);
            return Ok(ConfigFile::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| {
            MonitorError::ConfigError(format!("Failed to read {:?}: {}", path, e))
        })?;

        toml::from_str(&contents)
            .map_err(|e| MonitorError::ConfigError(format!("Failed to parse {:?}: {}", path, e)))
    }

    fn env_value(&self, key: &str) -> Option<String> {
        (self.env)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn thresholds(&self, file: &ThresholdOverrides) -> Thresholds {
        let d = Thresholds::default();
        Thresholds {
            stale_hours: self.hours(ENV_STALE_HOURS, file.stale_hours, d.stale_hours),
            owner_ping_hours: self.hours(ENV_OWNER_PING_HOURS, file.owner_ping_hours, d.owner_ping_hours),
            approved_reminder_hours: self.hours(
                ENV_APPROVED_REMINDER_HOURS,
                file.approved_reminder_hours,
                d.approved_reminder_hours,
            ),
            approved_escalation_hours: self.hours(
                ENV_APPROVED_ESCALATION_HOURS,
                file.approved_escalation_hours,
                d.approved_escalation_hours,
            ),
            stable_terminal_hours: self.hours(
                ENV_STABLE_TERMINAL_HOURS,
                file.stable_terminal_hours,
                d.stable_terminal_hours,
            ),
            stable_terminal_streak: self.count(
                ENV_STABLE_TERMINAL_STREAK,
                file.stable_terminal_streak,
                d.stable_terminal_streak,
            ),
            normal_interval_minutes: self.count(
                ENV_POLL_MINUTES,
                file.normal_interval_minutes,
                d.normal_interval_minutes,
            ),
            downshift_interval_minutes: self.count(
                ENV_DOWNSHIFT_MINUTES,
                file.downshift_interval_minutes,
                d.downshift_interval_minutes,
            ),
            unchanged_alerts_per_day: self.count(
                ENV_UNCHANGED_ALERTS,
                file.unchanged_alerts_per_day,
                d.unchanged_alerts_per_day,
            ),
            skip_escalation_threshold: self.count(
                ENV_SKIP_ESCALATION,
                file.skip_escalation_threshold,
                d.skip_escalation_threshold,
            ),
            merge_ready_streak: self.count(
                ENV_MERGE_READY_STREAK,
                file.merge_ready_streak,
                d.merge_ready_streak,
            ),
            report_lookback_hours: self.hours(
                ENV_REPORT_LOOKBACK_HOURS,
                file.report_lookback_hours,
                d.report_lookback_hours,
            ),
        }
    }

    fn hours(&self, key: &str, from_file: Option<f64>, default: f64) -> f64 {
        let mut value = from_file.map_or(default, |v| positive_hours(key, v, default));
        if let Some(raw) = self.env_value(key) {
            value = match raw.parse::<f64>() {
                Ok(v) => positive_hours(key, v, default),
                Err(_) => {
                    warn!("{}={:?} is not a number, using default {}", key, raw, default);
                    default
                }
            };
        }
        value
    }

    fn count(&self, key: &str, from_file: Option<i64>, default: u32) -> u32 {
        let mut value = from_file.map_or(default, |v| positive_count(key, v, default));
        if let Some(raw) = self.env_value(key) {
            value = match raw.parse::<i64>() {
                Ok(v) => positive_count(key, v, default),
                Err(_) => {
                    warn!("{}={:?} is not an integer, using default {}", key, raw, default);
                    default
                }
            };
        }
        value
    }

    fn item_number(&self, key: &str, from_file: Option<u64>) -> Option<u64> {
        match self.env_value(key) {
            Some(raw) => match raw.trim_start_matches('#').parse::<u64>() {
                Ok(n) if n > 0 => Some(n),
                _ => {
                    warn!("{}={:?} is not a valid issue/PR number, ignoring", key, raw);
                    None
                }
            },
            None => from_file.filter(|n| *n > 0),
        }
    }
}

/// `value` when finite and positive, otherwise `default` with a warning.
pub fn positive_hours(key: &str, value: f64, default: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        warn!("{} must be positive (got {}), using default {}", key, value, default);
        default
    }
}

fn positive_count(key: &str, value: i64, default: u32) -> u32 {
    match u32::try_from(value) {
        Ok(v) if v > 0 => v,
        _ => {
            warn!("{} must be a positive integer (got {}), using default {}", key, value, default);
            default
        }
    }
}
