use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

use crate::report::render::{format_timestamp, summarize};
use crate::state::document::MonitorState;
use crate::state::snapshot::count_keys;

/// Roll-up of the recent runs inside a lookback window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub runs: usize,
    pub changed_runs: usize,
    pub count_totals: BTreeMap<String, u64>,
    pub latest_signals: BTreeSet<String>,
    pub latest_summary: Option<String>,
}

impl RunReport {
    /// Aggregate at most `max_runs` of the most recent runs at or after
    /// `now - lookback_hours`.
    pub fn build(state: &MonitorState, now: DateTime<Utc>, lookback_hours: f64, max_runs: usize) -> Self {
        let window_start = window_start(now, lookback_hours);

        let in_window: Vec<_> = state
            .runs
            .iter()
            .filter(|run| run.run_at >= window_start && run.run_at <= now)
            .collect();
        let skip = in_window.len().saturating_sub(max_runs);
        let selected = &in_window[skip..];

        let count_totals = count_keys::ALL
            .iter()
            .map(|key| {
                let total: u64 = selected.iter().map(|run| run.counts.get(key)).sum();
                (key.to_string(), total)
            })
            .collect();

        let latest = selected.last();

        Self {
            window_start,
            window_end: now,
            runs: selected.len(),
            changed_runs: selected.iter().filter(|run| run.changed).count(),
            count_totals,
            latest_signals: latest.map(|run| run.signals.clone()).unwrap_or_default(),
            latest_summary: latest.map(|run| summarize(run)),
        }
    }

    pub fn render(&self) -> String {
        let mut lines = vec![
            format!(
                "Runs between {} and {}: {} ({} changed)",
                format_timestamp(self.window_start),
                format_timestamp(self.window_end),
                self.runs,
                self.changed_runs
            ),
            "Count totals:".to_string(),
        ];
        for key in count_keys::ALL {
            lines.push(format!("- {}: {}", key, self.count_totals.get(*key).copied().unwrap_or(0)));
        }

        if self.latest_signals.is_empty() {
            lines.push("Latest signals: none".to_string());
        } else {
            let signals: Vec<_> = self.latest_signals.iter().cloned().collect();
            lines.push(format!("Latest signals: {}", signals.join(", ")));
        }

        match &self.latest_summary {
            Some(summary) => {
                lines.push(String::new());
                lines.push("Latest summary:".to_string());
                lines.push(summary.clone());
            }
            None => lines.push("No runs in window.".to_string()),
        }

        lines.join("\n")
    }
}

/// Start of the lookback window. Windows reaching past the representable range
/// start at the earliest representable time; NaN and non-positive lookbacks
/// give an empty window.
pub fn window_start(now: DateTime<Utc>, lookback_hours: f64) -> DateTime<Utc> {
    if lookback_hours.is_nan() || lookback_hours <= 0.0 {
        warn!("Report lookback must be positive (got {}), window is empty", lookback_hours);
        return now;
    }

    let millis = lookback_hours * 3_600_000.0;
    if millis >= i64::MAX as f64 {
        return DateTime::<Utc>::MIN_UTC;
    }

    Duration::try_milliseconds(millis as i64)
        .and_then(|span| now.checked_sub_signed(span))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::snapshot::{Counts, Snapshot};
    use chrono::TimeZone;

    fn run(hours_ago: i64, open: u64, changed: bool) -> Snapshot {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let mut snapshot = Snapshot {
            run_at: now - Duration::hours(hours_ago),
            counts: Counts::from([("open", open)]),
            changed,
            ..Snapshot::default()
        };
        if open > 0 {
            snapshot.signals.insert(format!("marker_{}", hours_ago));
        }
        snapshot
    }

    #[test]
    fn test_report_sums_runs_in_window() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let mut state = MonitorState::default();
        for snapshot in [run(30, 9, true), run(10, 2, true), run(5, 1, false), run(1, 3, true)] {
            state.push_run(snapshot);
        }

        let report = RunReport::build(&state, now, 24.0, 10);
        assert_eq!(report.runs, 3);
        assert_eq!(report.changed_runs, 2);
        assert_eq!(report.count_totals["open"], 6);
        assert!(report.latest_signals.contains("marker_1"));
        assert!(report.latest_summary.as_deref().unwrap().contains("Open issues requiring handling: 3"));
    }

    #[test]
    fn test_report_respects_max_runs() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let mut state = MonitorState::default();
        for snapshot in [run(3, 1, true), run(2, 1, true), run(1, 1, true)] {
            state.push_run(snapshot);
        }

        let report = RunReport::build(&state, now, 24.0, 2);
        assert_eq!(report.runs, 2);
        assert_eq!(report.count_totals["open"], 2);
    }

    #[test]
    fn test_unbounded_lookback_covers_all_history() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let mut state = MonitorState::default();
        for snapshot in [run(24 * 365 * 50, 1, true), run(1, 2, true)] {
            state.push_run(snapshot);
        }

        for hours in [1e10, 1e300, f64::INFINITY] {
            let report = RunReport::build(&state, now, hours, 10);
            assert_eq!(report.runs, 2, "lookback {}", hours);
            assert_eq!(report.window_start, DateTime::<Utc>::MIN_UTC);
            assert!(report.render().contains("(2 changed)"));
        }
    }

    #[test]
    fn test_nan_or_negative_lookback_is_empty_window() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let mut state = MonitorState::default();
        state.push_run(run(1, 2, true));

        for hours in [f64::NAN, -5.0, f64::NEG_INFINITY] {
            let report = RunReport::build(&state, now, hours, 10);
            assert_eq!(report.window_start, now);
            assert_eq!(report.runs, 0);
        }
    }

    #[test]
    fn test_empty_report_renders() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let report = RunReport::build(&MonitorState::default(), now, 24.0, 10);
        let rendered = report.render();
        assert!(rendered.contains("0 changed"));
        assert!(rendered.contains("No runs in window."));
    }
}
