//! Scan orchestration
//!
//! One scan is a strictly ordered sequence: load state, read the tracker,
//! classify, detect changes, schedule, publish, persist. Any tracker failure
//! aborts the scan before state is written.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::classification::{
    ClassificationEngine, ClassificationInput, EntityNormalizer, PrStateCache, RuntimeStateTracker,
};
use crate::config::{positive_hours, MonitorConfig, Thresholds};
use crate::error::Result;
use crate::github::{upsert_comment, Tracker, UpsertOutcome};
use crate::policy::{
    ChangeDetector, ChangeReport, CommentKind, NotificationPolicy, PollingScheduler,
};
use crate::report::{build_skip_summary, summarize, RunReport};
use crate::state::{count_keys, metric_keys, MonitorState, Snapshot, StateStore};

/// Counts that must all be zero for a scan to extend the clean-run streak.
const CLEAN_RUN_KEYS: &[&str] = &[
    count_keys::OPEN,
    count_keys::NBS_UNBOUND,
    count_keys::CHANGE_REQUESTS,
    count_keys::STALE_OPEN_PRS,
];

#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOptions {
    /// Upsert the audit-delta and digest comments on changed scans.
    pub post_comments: bool,
    /// Apply the "nothing changed" throttle to the printed output.
    pub report_mode: bool,
    /// Compute everything but write neither comments nor state.
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostedComment {
    pub kind: CommentKind,
    pub target: u64,
    pub outcome: UpsertOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkipNotice {
    pub text: String,
    pub escalated: bool,
}

#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub snapshot: Snapshot,
    pub change: ChangeReport,
    pub comments: Vec<PostedComment>,
    pub skip_notice: Option<SkipNotice>,
    pub persisted: bool,
}

impl ScanOutcome {
    /// Text for report mode: the full summary on a changed scan, the skip
    /// notice on an unchanged one, nothing when the throttle suppressed it.
    pub fn report_text(&self) -> Option<String> {
        if self.change.changed {
            Some(summarize(&self.snapshot))
        } else {
            self.skip_notice.as_ref().map(|notice| notice.text.clone())
        }
    }
}

pub struct ReviewMonitor<T, S> {
    tracker: T,
    store: S,
    config: MonitorConfig,
}

impl<T: Tracker, S: StateStore> ReviewMonitor<T, S> {
    pub fn new(tracker: T, store: S, config: MonitorConfig) -> Self {
        Self {
            tracker,
            store,
            config,
        }
    }

    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub async fn scan(&self, now: DateTime<Utc>, options: ScanOptions) -> Result<ScanOutcome> {
        let thresholds = &self.config.thresholds;
        let mut state = self.store.load()?;
        let previous = state.last_run().cloned();

        info!(
            "Starting scan ({} stored runs, watch label '{}')",
            state.runs.len(),
            self.config.watch_label
        );

        let issues = self.tracker.list_issues(None).await?;
        let pull_requests = self.tracker.list_pull_requests().await?;
        debug!("Fetched {} open issues and {} open PRs", issues.len(), pull_requests.len());

        let mut cache = PrStateCache::new();
        let linked = EntityNormalizer::link_issues(&self.tracker, issues, &mut cache).await?;

        let runtime = RuntimeStateTracker::track(&pull_requests, state.pr_runtime.as_ref(), now);

        let mut snapshot = ClassificationEngine::build_snapshot(&ClassificationInput {
            issues: &linked,
            runtime: &runtime,
            thresholds,
            watch_label: &self.config.watch_label,
            audit_pr: self.config.audit_pr,
            now,
        });
        snapshot
            .metrics
            .insert(metric_keys::PR_STATE_LOOKUPS.to_string(), cache.lookups() as f64);

        let change = ChangeDetector::detect(&snapshot, previous.as_ref());
        ChangeDetector::apply(&mut snapshot, &change);

        if let Some(previous) = previous.as_ref() {
            for key in count_keys::ALL {
                let delta = snapshot.counts.get(key) as f64 - previous.counts.get(key) as f64;
                snapshot.metrics.insert(metric_keys::delta(key), delta);
            }
        }

        let clean = CLEAN_RUN_KEYS.iter().all(|key| snapshot.counts.get(key) == 0);
        state.clean_run_streak = if clean { state.clean_run_streak + 1 } else { 0 };
        snapshot.clean_run_streak = state.clean_run_streak;
        snapshot.merge_ready = state.clean_run_streak >= thresholds.merge_ready_streak;

        let decision = PollingScheduler::decide(&snapshot, thresholds);
        PollingScheduler::apply(&mut snapshot, &decision);

        info!(
            "Scan classified: changed={} source={} mode={} interval={}m",
            change.changed,
            change.source_label(),
            decision.mode,
            decision.interval_minutes
        );

        let mut comments = Vec::new();
        if options.post_comments && !options.dry_run {
            let plans = NotificationPolicy::plan_comments(
                &snapshot,
                previous.as_ref(),
                self.config.audit_pr,
                self.config.digest_issue,
            );
            for plan in plans {
                let outcome = upsert_comment(&self.tracker, plan.target, plan.marker, &plan.body).await?;
                info!("Published {} comment on #{} ({:?})", plan.kind, plan.target, outcome);
                comments.push(PostedComment {
                    kind: plan.kind,
                    target: plan.target,
                    outcome,
                });
            }
        }

        let skip_notice = if change.changed {
            NotificationPolicy::reset_skips(&mut state);
            None
        } else if options.report_mode {
            let skip = NotificationPolicy::throttle_unchanged(&mut state, now.date_naive(), thresholds);
            if skip.emit {
                let text = build_skip_summary(
                    previous.as_ref(),
                    &snapshot,
                    skip.consecutive_skips,
                    skip.escalated,
                );
                if skip.escalated {
                    warn!("{} consecutive unchanged scans", skip.consecutive_skips);
                }
                Some(SkipNotice {
                    text,
                    escalated: skip.escalated,
                })
            } else {
                info!(
                    "Unchanged scan suppressed ({} consecutive, {} alerts today)",
                    skip.consecutive_skips, state.unchanged_alert_count
                );
                None
            }
        } else {
            None
        };

        state.push_run(snapshot.clone());
        state.pr_runtime = Some(runtime.next_state);

        let persisted = if options.dry_run {
            info!("Dry run, state not saved");
            false
        } else {
            self.store.save(&state)?;
            true
        };

        Ok(ScanOutcome {
            snapshot,
            change,
            comments,
            skip_notice,
            persisted,
        })
    }

    pub fn report(&self, now: DateTime<Utc>, lookback_hours: Option<f64>, max_runs: usize) -> Result<RunReport> {
        run_report(&self.store, &self.config.thresholds, now, lookback_hours, max_runs)
    }

    pub fn status(&self) -> Result<Option<String>> {
        latest_status(&self.store)
    }
}

/// Aggregate the stored runs inside the lookback window. An override that is
/// not finite and positive falls back to the configured lookback.
pub fn run_report<S: StateStore + ?Sized>(
    store: &S,
    thresholds: &Thresholds,
    now: DateTime<Utc>,
    lookback_hours: Option<f64>,
    max_runs: usize,
) -> Result<RunReport> {
    let state = store.load()?;
    let default = thresholds.report_lookback_hours;
    let hours = lookback_hours.map_or(default, |h| positive_hours("--hours", h, default));
    Ok(RunReport::build(&state, now, hours, max_runs))
}

/// Summary of the latest stored run, if any.
pub fn latest_status<S: StateStore + ?Sized>(store: &S) -> Result<Option<String>> {
    let state = store.load()?;
    Ok(status_text(&state))
}

pub fn status_text(state: &MonitorState) -> Option<String> {
    let latest = state.last_run()?;
    Some(format!(
        "{}\nStored runs: {}\nconsecutiveNoUpdateSkips: {}",
        summarize(latest),
        state.runs.len(),
        state.consecutive_no_update_skips
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_text_requires_a_run() {
        assert!(status_text(&MonitorState::default()).is_none());

        let mut state = MonitorState::default();
        state.push_run(Snapshot::default());
        let text = status_text(&state).unwrap();
        assert!(text.contains("Stored runs: 1"));
    }

    #[derive(Default)]
    struct FixedStore(MonitorState);

    impl StateStore for FixedStore {
        fn load(&self) -> Result<MonitorState> {
            Ok(self.0.clone())
        }

        fn save(&self, _state: &MonitorState) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_run_report_rejects_invalid_hours_override() {
        let now = Utc::now();
        let mut state = MonitorState::default();
        state.push_run(Snapshot {
            run_at: now - chrono::Duration::hours(2),
            ..Snapshot::default()
        });
        let store = FixedStore(state);
        let thresholds = Thresholds::default();

        for hours in [f64::NAN, -1.0, 0.0, f64::INFINITY] {
            let report = run_report(&store, &thresholds, now, Some(hours), 10).unwrap();
            assert_eq!(report.runs, 1, "override {}", hours);
            assert_eq!(report.window_start, now - chrono::Duration::hours(24));
        }

        let report = run_report(&store, &thresholds, now, Some(1.0), 10).unwrap();
        assert_eq!(report.runs, 0);
        let report = run_report(&store, &thresholds, now, Some(1e10), 10).unwrap();
        assert_eq!(report.runs, 1);
    }

    #[test]
    fn test_latest_status_reads_store() {
        assert!(latest_status(&FixedStore::default()).unwrap().is_none());

        let mut state = MonitorState::default();
        state.push_run(Snapshot::default());
        let text = latest_status(&FixedStore(state)).unwrap().unwrap();
        assert!(text.contains("Stored runs: 1"));
    }

    #[test]
    fn test_report_text_prefers_summary_when_changed() {
        let outcome = ScanOutcome {
            snapshot: Snapshot::default(),
            change: ChangeReport {
                changed: false,
                ..ChangeReport::default()
            },
            comments: Vec::new(),
            skip_notice: None,
            persisted: true,
        };
        assert!(outcome.report_text().is_none());

        let changed = ScanOutcome {
            change: ChangeReport {
                changed: true,
                ..ChangeReport::default()
            },
            ..outcome
        };
        assert!(changed.report_text().unwrap().contains("Open issues requiring handling: 0"));
    }
}
