//! Classification engine
//!
//! Partitions issues and PRs into the actionable buckets of a snapshot and
//! raises the matching signals. Pure: all tracker I/O has already happened.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::classification::runtime::RuntimeUpdate;
use crate::classification::types::{IssueRef, LinkedIssue, PrRef, TrackedPullRequest};
use crate::config::Thresholds;
use crate::state::snapshot::{count_keys, metric_keys, Counts, Signal, Snapshot};

pub struct ClassificationInput<'a> {
    pub issues: &'a [LinkedIssue],
    pub runtime: &'a RuntimeUpdate,
    pub thresholds: &'a Thresholds,
    pub watch_label: &'a str,
    pub audit_pr: Option<u64>,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct IssueBuckets {
    pub actionable: Vec<IssueRef>,
    pub bound: Vec<IssueRef>,
    pub watched: Vec<IssueRef>,
    pub watched_unbound: Vec<IssueRef>,
}

#[derive(Debug, Default)]
pub struct PrBuckets {
    pub change_requests: Vec<PrRef>,
    pub watchdog: Vec<PrRef>,
    pub digest: Vec<PrRef>,
    pub owner_ping: Vec<PrRef>,
    pub stable_terminal: Vec<PrRef>,
    pub new_prs: Vec<PrRef>,
    pub approved_unmerged: Vec<PrRef>,
    /// Highest-severity approval signal for this scan, if any.
    pub approval_signal: Option<Signal>,
}

pub struct ClassificationEngine;

impl ClassificationEngine {
    pub fn classify_issues(issues: &[LinkedIssue], watch_label: &str) -> IssueBuckets {
        let mut buckets = IssueBuckets::default();

        for linked in issues {
            let issue_ref = linked.to_ref();
            let watched = linked.issue.has_label(watch_label);
            let bound = linked.is_bound();

            if watched {
                buckets.watched.push(issue_ref.clone());
                if !bound {
                    buckets.watched_unbound.push(issue_ref.clone());
                }
            }

            if bound {
                buckets.bound.push(issue_ref);
            } else {
                buckets.actionable.push(issue_ref);
            }
        }

        buckets
    }

    pub fn is_stale(pr: &TrackedPullRequest, thresholds: &Thresholds) -> bool {
        pr.unchanged_hours.is_some_and(|h| h >= thresholds.stale_hours)
    }

    /// Owner pings need a stale PR, the larger age threshold and a known author.
    pub fn is_owner_ping_candidate(pr: &TrackedPullRequest, thresholds: &Thresholds) -> bool {
        Self::is_stale(pr, thresholds)
            && pr.unchanged_hours.is_some_and(|h| h >= thresholds.owner_ping_hours)
            && pr.has_author()
    }

    pub fn is_stable_terminal(pr: &TrackedPullRequest, thresholds: &Thresholds) -> bool {
        pr.review_decision.is_approved()
            && pr.no_update_hours >= thresholds.stable_terminal_hours
            && pr.no_update_streak >= thresholds.stable_terminal_streak
    }

    pub fn classify_pull_requests(
        prs: &[TrackedPullRequest],
        new_prs: &[u64],
        thresholds: &Thresholds,
    ) -> PrBuckets {
        let mut buckets = PrBuckets::default();
        let mut ordered: Vec<&TrackedPullRequest> = prs.iter().collect();
        ordered.sort_by_key(|pr| pr.number);

        let mut max_approved_hours: Option<f64> = None;

        for pr in ordered {
            let pr_ref = PrRef::from(pr);
            let change_requested = pr.review_decision.is_changes_requested();
            let stale = Self::is_stale(pr, thresholds);
            let owner_ping = Self::is_owner_ping_candidate(pr, thresholds);

            if change_requested {
                buckets.change_requests.push(pr_ref.clone());
            }
            if owner_ping {
                buckets.owner_ping.push(pr_ref.clone());
            }

            if change_requested || owner_ping {
                buckets.watchdog.push(pr_ref.clone());
            } else if stale {
                if Self::is_stable_terminal(pr, thresholds) {
                    buckets.stable_terminal.push(pr_ref.clone());
                }
                buckets.digest.push(pr_ref.clone());
            }

            if pr.review_decision.is_approved() {
                buckets.approved_unmerged.push(pr_ref.clone());
                let hours = pr.approved_but_unmerged_hours;
                max_approved_hours = Some(max_approved_hours.map_or(hours, |m| m.max(hours)));
            }

            if new_prs.contains(&pr.number) {
                buckets.new_prs.push(pr_ref);
            }

            debug!(
                "PR #{}: stale={} change_requested={} owner_ping={} unchanged={:?}",
                pr.number, stale, change_requested, owner_ping, pr.unchanged_hours
            );
        }

        buckets.approval_signal = max_approved_hours.and_then(|hours| {
            if hours >= thresholds.approved_escalation_hours {
                Some(Signal::ApprovedButUnmergedEscalation)
            } else if hours >= thresholds.approved_reminder_hours {
                Some(Signal::ApprovedButUnmergedReminder)
            } else {
                None
            }
        });

        buckets
    }

    /// Build the snapshot for one scan. Change-detection and polling fields are
    /// left at their defaults for later stages to fill in.
    pub fn build_snapshot(input: &ClassificationInput<'_>) -> Snapshot {
        let issues = Self::classify_issues(input.issues, input.watch_label);
        let prs = &input.runtime.prs;
        let buckets = Self::classify_pull_requests(prs, &input.runtime.new_prs, input.thresholds);

        let mut snapshot = Snapshot {
            run_at: input.now,
            ts: input.now.timestamp(),
            watch_label: input.watch_label.to_string(),
            ..Snapshot::default()
        };

        let mut counts = Counts::new();
        counts.set(count_keys::OPEN, issues.actionable.len() as u64);
        counts.set(count_keys::BOUND, issues.bound.len() as u64);
        counts.set(count_keys::NBS, issues.watched.len() as u64);
        counts.set(count_keys::NBS_UNBOUND, issues.watched_unbound.len() as u64);
        counts.set(count_keys::OPEN_PRS, prs.len() as u64);
        counts.set(count_keys::CHANGE_REQUESTS, buckets.change_requests.len() as u64);
        counts.set(count_keys::STALE_OPEN_PRS, buckets.watchdog.len() as u64);
        counts.set(count_keys::STALE_OPEN_PRS_DIGEST, buckets.digest.len() as u64);
        counts.set(count_keys::OWNER_PING_CANDIDATES, buckets.owner_ping.len() as u64);
        counts.set(count_keys::STABLE_TERMINAL_PRS, buckets.stable_terminal.len() as u64);
        counts.set(count_keys::NEW_PRS, buckets.new_prs.len() as u64);
        counts.set(count_keys::APPROVED_UNMERGED_PRS, buckets.approved_unmerged.len() as u64);
        snapshot.counts = counts;

        if issues.actionable.is_empty() && !prs.is_empty() {
            snapshot.add_signal(Signal::Stagnation);
        }
        if !buckets.owner_ping.is_empty() {
            snapshot.add_signal(Signal::OwnerPingPolicy);
        }
        if !buckets.change_requests.is_empty() {
            snapshot.add_signal(Signal::ChangeRequestsPending);
        }
        if !buckets.watchdog.is_empty() {
            snapshot.add_signal(Signal::StalePrWatchdog);
        }
        if !buckets.new_prs.is_empty() {
            snapshot.add_signal(Signal::NewPrsDetected);
        }
        if !buckets.stable_terminal.is_empty() {
            snapshot.add_signal(Signal::StableTerminalPrs);
        }
        if let Some(signal) = buckets.approval_signal {
            snapshot.add_signal(signal);
        }

        let known_ages: Vec<f64> = prs.iter().filter_map(|pr| pr.unchanged_hours).collect();
        if let Some(max) = known_ages.iter().copied().reduce(f64::max) {
            snapshot.metrics.insert(metric_keys::MAX_UNCHANGED_HOURS.to_string(), max);
        }
        if let Some(max) = buckets
            .approved_unmerged
            .iter()
            .map(|pr| pr.approved_but_unmerged_hours)
            .reduce(f64::max)
        {
            snapshot
                .metrics
                .insert(metric_keys::MAX_APPROVED_BUT_UNMERGED_HOURS.to_string(), max);
        }
        snapshot.metrics.insert(
            metric_keys::UNKNOWN_AGE_PRS.to_string(),
            (prs.len() - known_ages.len()) as f64,
        );
        snapshot.metrics.insert(
            metric_keys::SHA_CHANGED_PRS.to_string(),
            input.runtime.sha_changed as f64,
        );
        snapshot.metrics.insert(
            metric_keys::REVIEW_DECISION_CHANGED_PRS.to_string(),
            input.runtime.review_decision_changed as f64,
        );
        if let Some(hours) = input
            .audit_pr
            .and_then(|number| prs.iter().find(|pr| pr.number == number))
            .and_then(|pr| pr.unchanged_hours)
        {
            snapshot
                .metrics
                .insert(metric_keys::AUDIT_PR_UNCHANGED_HOURS.to_string(), hours);
        }

        snapshot.open = issues.actionable;
        snapshot.bound = issues.bound;
        snapshot.nbs = issues.watched;
        snapshot.nbs_unbound = issues.watched_unbound;

        let mut open_prs = prs.clone();
        open_prs.sort_by_key(|pr| pr.number);
        snapshot.open_prs = open_prs;
        snapshot.change_requests = buckets.change_requests;
        snapshot.stale_open_prs = buckets.watchdog;
        snapshot.stale_open_prs_digest = buckets.digest;
        snapshot.owner_ping_candidates = buckets.owner_ping;
        snapshot.stable_terminal_prs = buckets.stable_terminal;
        snapshot.new_prs = buckets.new_prs;
        snapshot.approved_unmerged_prs = buckets.approved_unmerged;

        snapshot
    }
}
