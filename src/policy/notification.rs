//! Notification policy
//!
//! Decides which marker comments a scan publishes and whether an unchanged
//! scan prints anything at all in report mode.

use chrono::NaiveDate;
use std::fmt;
use tracing::debug;

use crate::config::Thresholds;
use crate::report::render;
use crate::state::document::MonitorState;
use crate::state::snapshot::Snapshot;

pub const AUDIT_DELTA_MARKER: &str = "<!-- review-monitor:audit-delta -->";
pub const DIGEST_MARKER: &str = "<!-- review-monitor:stale-pr-digest -->";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentKind {
    AuditDelta,
    Digest,
}

impl fmt::Display for CommentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuditDelta => write!(f, "audit-delta"),
            Self::Digest => write!(f, "stale-pr-digest"),
        }
    }
}

/// One comment the scan intends to upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct CommentPlan {
    pub kind: CommentKind,
    pub target: u64,
    pub marker: &'static str,
    pub body: String,
}

/// Outcome of the "nothing changed" throttle for one unchanged scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkipDecision {
    /// Skip counter value this scan was judged at.
    pub consecutive_skips: u32,
    pub emit: bool,
    pub escalated: bool,
}

pub struct NotificationPolicy;

impl NotificationPolicy {
    /// Comments to publish for this scan. Empty unless the scan changed.
    pub fn plan_comments(
        current: &Snapshot,
        previous: Option<&Snapshot>,
        audit_pr: Option<u64>,
        digest_issue: Option<u64>,
    ) -> Vec<CommentPlan> {
        if !current.changed {
            debug!("Scan unchanged, no comments planned");
            return Vec::new();
        }

        let mut plans = Vec::new();

        if let Some(target) = audit_pr {
            plans.push(CommentPlan {
                kind: CommentKind::AuditDelta,
                target,
                marker: AUDIT_DELTA_MARKER,
                body: render::build_audit_delta_comment(target, current, previous),
            });
        }

        if let Some(target) = digest_issue {
            if current.stale_open_prs_digest.is_empty() {
                debug!("Digest tier empty, skipping digest comment on #{}", target);
            } else {
                plans.push(CommentPlan {
                    kind: CommentKind::Digest,
                    target,
                    marker: DIGEST_MARKER,
                    body: render::build_digest_comment(current),
                });
            }
        }

        plans
    }

    /// Advance the skip bookkeeping for an unchanged report-mode scan.
    ///
    /// The day budget resets when `today` differs from the stored day. A
    /// summary is printed while budget remains or once the skip counter
    /// reaches the escalation threshold. Escalated prints leave the budget
    /// untouched and restart the skip counter.
    pub fn throttle_unchanged(
        state: &mut MonitorState,
        today: NaiveDate,
        thresholds: &Thresholds,
    ) -> SkipDecision {
        if state.unchanged_alert_day != Some(today) {
            state.unchanged_alert_day = Some(today);
            state.unchanged_alert_count = 0;
        }

        state.consecutive_no_update_skips += 1;
        let consecutive_skips = state.consecutive_no_update_skips;

        let escalated = consecutive_skips >= thresholds.skip_escalation_threshold;
        let budget_left = state.unchanged_alert_count < thresholds.unchanged_alerts_per_day;

        if escalated {
            state.consecutive_no_update_skips = 0;
        } else if budget_left {
            state.unchanged_alert_count += 1;
        }

        SkipDecision {
            consecutive_skips,
            emit: escalated || budget_left,
            escalated,
        }
    }

    /// A changed scan clears the skip counter.
    pub fn reset_skips(state: &mut MonitorState) {
        state.consecutive_no_update_skips = 0;
    }
}
