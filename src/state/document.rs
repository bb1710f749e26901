use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::classification::runtime::PrRuntimeMap;
use crate::state::snapshot::Snapshot;

/// Maximum number of snapshots kept in `runs`; the oldest are evicted first.
pub const MAX_RUNS: usize = 300;

/// The whole persisted document. Read once per scan and rewritten in full.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MonitorState {
    pub runs: Vec<Snapshot>,
    pub latest_run: Option<Snapshot>,
    pub clean_run_streak: u32,
    pub consecutive_no_update_skips: u32,
    pub unchanged_alert_day: Option<NaiveDate>,
    pub unchanged_alert_count: u32,
    pub next_action_at: Option<DateTime<Utc>>,
    /// Per-PR runtime state from the previous scan; `None` until the first scan.
    pub pr_runtime: Option<PrRuntimeMap>,
}

impl MonitorState {
    pub fn last_run(&self) -> Option<&Snapshot> {
        self.latest_run.as_ref().or_else(|| self.runs.last())
    }

    /// Append a snapshot, evicting the oldest runs beyond [`MAX_RUNS`].
    pub fn push_run(&mut self, snapshot: Snapshot) {
        self.runs.push(snapshot.clone());
        if self.runs.len() > MAX_RUNS {
            let excess = self.runs.len() - MAX_RUNS;
            self.runs.drain(..excess);
        }
        self.next_action_at = snapshot.next_action_at;
        self.latest_run = Some(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_push_run_is_bounded() {
        let mut state = MonitorState::default();
        let base = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();

        for i in 0..(MAX_RUNS as i64 + 5) {
            let snapshot = Snapshot {
                run_at: base + chrono::Duration::minutes(i * 20),
                ts: i,
                ..Snapshot::default()
            };
            state.push_run(snapshot);
        }

        assert_eq!(state.runs.len(), MAX_RUNS);
        assert_eq!(state.runs[0].ts, 5);
        assert_eq!(state.last_run().map(|s| s.ts), Some(MAX_RUNS as i64 + 4));
        assert_eq!(state.runs.last(), state.latest_run.as_ref());
    }

    #[test]
    fn test_last_run_falls_back_to_history_tail() {
        let state = MonitorState {
            runs: vec![Snapshot {
                ts: 42,
                ..Snapshot::default()
            }],
            ..MonitorState::default()
        };
        assert_eq!(state.last_run().map(|s| s.ts), Some(42));
    }
}
