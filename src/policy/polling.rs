use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::Thresholds;
use crate::state::snapshot::{count_keys, metric_keys, Signal, Snapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PollingMode {
    Resume,
    #[default]
    Normal,
    DownshiftStableTerminalPrs,
}

impl PollingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resume => "resume",
            Self::Normal => "normal",
            Self::DownshiftStableTerminalPrs => "downshift-stable-terminal-prs",
        }
    }
}

impl fmt::Display for PollingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingDecision {
    pub mode: PollingMode,
    pub interval_minutes: u32,
}

impl PollingDecision {
    pub fn next_action_at(&self, run_at: DateTime<Utc>) -> DateTime<Utc> {
        run_at + Duration::minutes(i64::from(self.interval_minutes))
    }
}

/// Counts that keep the cadence at the normal interval.
const URGENT_COUNT_KEYS: &[&str] = &[
    count_keys::OPEN,
    count_keys::NBS_UNBOUND,
    count_keys::CHANGE_REQUESTS,
    count_keys::OWNER_PING_CANDIDATES,
    count_keys::NEW_PRS,
];

pub struct PollingScheduler;

impl PollingScheduler {
    /// First matching rule wins:
    /// 1. head commit moved on any PR: resume
    /// 2. anything urgent pending: normal
    /// 3. no stable-terminal PRs to downshift for: normal
    /// 4. otherwise downshift
    pub fn decide(snapshot: &Snapshot, thresholds: &Thresholds) -> PollingDecision {
        let normal = thresholds.normal_interval_minutes;

        if snapshot.metric(metric_keys::SHA_CHANGED_PRS).unwrap_or(0.0) > 0.0 {
            return PollingDecision {
                mode: PollingMode::Resume,
                interval_minutes: normal,
            };
        }

        let urgent_counts = URGENT_COUNT_KEYS.iter().any(|key| snapshot.counts.get(key) > 0);
        let approval_pending = snapshot.has_signal(Signal::ApprovedButUnmergedEscalation)
            || snapshot.has_signal(Signal::ApprovedButUnmergedReminder);
        if urgent_counts || approval_pending {
            return PollingDecision {
                mode: PollingMode::Normal,
                interval_minutes: normal,
            };
        }

        if snapshot.counts.get(count_keys::STABLE_TERMINAL_PRS) == 0 {
            return PollingDecision {
                mode: PollingMode::Normal,
                interval_minutes: normal,
            };
        }

        PollingDecision {
            mode: PollingMode::DownshiftStableTerminalPrs,
            interval_minutes: thresholds.downshift_interval_minutes,
        }
    }

    pub fn apply(snapshot: &mut Snapshot, decision: &PollingDecision) {
        snapshot.polling_mode = decision.mode;
        snapshot.polling_interval_minutes = decision.interval_minutes;
        snapshot.next_action_at = Some(decision.next_action_at(snapshot.run_at));
    }
}
