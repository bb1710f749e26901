//! Scan snapshot
//!
//! The atomic output of one scan. Snapshots are appended to the run history
//! and read back by later scans, so every field tolerates absence and the
//! count table resolves legacy key names through one accessor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::classification::types::{IssueRef, PrRef, TrackedPullRequest};
use crate::config::DEFAULT_WATCH_LABEL;
use crate::github::types::ReviewDecision;
use crate::policy::change_detection::ChangeSource;
use crate::policy::polling::PollingMode;

pub mod count_keys {
    pub const OPEN: &str = "open";
    pub const BOUND: &str = "bound";
    pub const NBS: &str = "nbs";
    pub const NBS_UNBOUND: &str = "nbsUnbound";
    pub const OPEN_PRS: &str = "openPrs";
    pub const CHANGE_REQUESTS: &str = "changeRequests";
    pub const STALE_OPEN_PRS: &str = "staleOpenPrs";
    pub const STALE_OPEN_PRS_DIGEST: &str = "staleOpenPrsDigest";
    pub const OWNER_PING_CANDIDATES: &str = "ownerPingCandidates";
    pub const STABLE_TERMINAL_PRS: &str = "stableTerminalPrs";
    pub const NEW_PRS: &str = "newPrs";
    pub const APPROVED_UNMERGED_PRS: &str = "approvedUnmergedPrs";

    /// Every canonical key, in display order.
    pub const ALL: &[&str] = &[
        OPEN,
        BOUND,
        NBS,
        NBS_UNBOUND,
        OPEN_PRS,
        CHANGE_REQUESTS,
        STALE_OPEN_PRS,
        STALE_OPEN_PRS_DIGEST,
        OWNER_PING_CANDIDATES,
        STABLE_TERMINAL_PRS,
        NEW_PRS,
        APPROVED_UNMERGED_PRS,
    ];
}

pub mod metric_keys {
    pub const MAX_UNCHANGED_HOURS: &str = "maxUnchangedHours";
    pub const MAX_APPROVED_BUT_UNMERGED_HOURS: &str = "maxApprovedButUnmergedHours";
    pub const UNKNOWN_AGE_PRS: &str = "unknownAgePrs";
    pub const SHA_CHANGED_PRS: &str = "shaChangedPrs";
    pub const REVIEW_DECISION_CHANGED_PRS: &str = "reviewDecisionChangedPrs";
    pub const AUDIT_PR_UNCHANGED_HOURS: &str = "auditPrUnchangedHours";
    pub const PR_STATE_LOOKUPS: &str = "prStateLookups";

    pub fn delta(count_key: &str) -> String {
        format!("{}Delta", count_key)
    }
}

/// Older documents stored some counts under different names. The canonical
/// key is tried first, then each alias in order.
const LEGACY_COUNT_ALIASES: &[(&str, &[&str])] = &[
    (count_keys::OPEN, &["assigned"]),
    (count_keys::STALE_OPEN_PRS, &["stalePrWatchdog"]),
    (count_keys::STALE_OPEN_PRS_DIGEST, &["digestCandidates"]),
    (count_keys::APPROVED_UNMERGED_PRS, &["approvedButUnmerged"]),
];

fn legacy_aliases(key: &str) -> &'static [&'static str] {
    LEGACY_COUNT_ALIASES
        .iter()
        .find(|(canonical, _)| *canonical == key)
        .map(|(_, aliases)| *aliases)
        .unwrap_or(&[])
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Counts(BTreeMap<String, u64>);

impl Counts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonical key first, then legacy aliases.
    pub fn lookup(&self, key: &str) -> Option<u64> {
        std::iter::once(key)
            .chain(legacy_aliases(key).iter().copied())
            .find_map(|k| self.0.get(k).copied())
    }

    /// Like [`Counts::lookup`], with absent counts read as zero.
    pub fn get(&self, key: &str) -> u64 {
        self.lookup(key).unwrap_or(0)
    }

    /// Store a count under its canonical key and every legacy alias.
    pub fn set(&mut self, key: &str, value: u64) {
        self.0.insert(key.to_string(), value);
        for alias in legacy_aliases(key) {
            self.0.insert((*alias).to_string(), value);
        }
    }

    pub fn raw(&self) -> &BTreeMap<String, u64> {
        &self.0
    }
}

impl<const N: usize> From<[(&str, u64); N]> for Counts {
    fn from(entries: [(&str, u64); N]) -> Self {
        Self(entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }
}

/// Named conditions a scan can raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Signal {
    Stagnation,
    OwnerPingPolicy,
    ChangeRequestsPending,
    StalePrWatchdog,
    NewPrsDetected,
    StableTerminalPrs,
    ApprovedButUnmergedReminder,
    ApprovedButUnmergedEscalation,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stagnation => "stagnation_signal",
            Self::OwnerPingPolicy => "owner_ping_policy",
            Self::ChangeRequestsPending => "change_requests_pending",
            Self::StalePrWatchdog => "stale_pr_watchdog",
            Self::NewPrsDetected => "new_prs_detected",
            Self::StableTerminalPrs => "stable_terminal_prs",
            Self::ApprovedButUnmergedReminder => "approved_but_unmerged_reminder",
            Self::ApprovedButUnmergedEscalation => "approved_but_unmerged_escalation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Snapshot {
    pub run_at: DateTime<Utc>,
    /// `run_at` as unix seconds.
    pub ts: i64,
    pub watch_label: String,

    /// Actionable issues. Older documents call this `assigned`.
    #[serde(alias = "assigned")]
    pub open: Vec<IssueRef>,
    pub bound: Vec<IssueRef>,
    pub nbs: Vec<IssueRef>,
    pub nbs_unbound: Vec<IssueRef>,

    pub open_prs: Vec<TrackedPullRequest>,
    pub change_requests: Vec<PrRef>,
    /// Watchdog tier: change-requested PRs plus owner-ping candidates.
    pub stale_open_prs: Vec<PrRef>,
    /// Digest tier: stale PRs outside the watchdog tier.
    pub stale_open_prs_digest: Vec<PrRef>,
    pub owner_ping_candidates: Vec<PrRef>,
    pub stable_terminal_prs: Vec<PrRef>,
    pub new_prs: Vec<PrRef>,
    pub approved_unmerged_prs: Vec<PrRef>,

    pub signals: BTreeSet<String>,
    pub metrics: BTreeMap<String, f64>,
    pub counts: Counts,

    pub changed: bool,
    pub change_detection_source: String,
    pub change_detection_sources: BTreeSet<ChangeSource>,
    pub change_details: Vec<String>,

    pub next_action_at: Option<DateTime<Utc>>,
    pub polling_mode: PollingMode,
    pub polling_interval_minutes: u32,
    pub clean_run_streak: u32,
    pub merge_ready: bool,
}

impl Snapshot {
    pub fn watch_label(&self) -> &str {
        if self.watch_label.is_empty() {
            DEFAULT_WATCH_LABEL
        } else {
            &self.watch_label
        }
    }

    pub fn has_signal(&self, signal: Signal) -> bool {
        self.signals.contains(signal.as_str())
    }

    pub fn add_signal(&mut self, signal: Signal) {
        self.signals.insert(signal.as_str().to_string());
    }

    pub fn metric(&self, key: &str) -> Option<f64> {
        self.metrics.get(key).copied()
    }

    pub fn head_shas(&self) -> BTreeMap<u64, &str> {
        self.open_prs
            .iter()
            .map(|pr| (pr.number, pr.head_sha.as_str()))
            .collect()
    }

    pub fn review_decisions(&self) -> BTreeMap<u64, &ReviewDecision> {
        self.open_prs
            .iter()
            .map(|pr| (pr.number, &pr.review_decision))
            .collect()
    }

    pub fn is_stable_terminal(&self, number: u64) -> bool {
        self.stable_terminal_prs.iter().any(|pr| pr.number == number)
    }
}
