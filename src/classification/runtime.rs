//! Runtime state tracking
//!
//! Diffs the current PR set against the per-PR state persisted by the
//! previous scan. A change in either the head SHA or the review decision
//! resets both the no-update streak and the no-update hour counter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::classification::normalize::{hours_between, unchanged_hours};
use crate::classification::types::TrackedPullRequest;
use crate::github::types::{PullRequest, ReviewDecision};

/// Per-PR state carried from one scan to the next.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrRuntimeEntry {
    pub head_sha: String,
    pub review_decision: ReviewDecision,
    pub no_update_streak: u32,
    pub no_update_hours: f64,
    pub approved_at: Option<DateTime<Utc>>,
    /// When this entry was written; used to accumulate `no_update_hours`.
    pub observed_at: Option<DateTime<Utc>>,
}

pub type PrRuntimeMap = BTreeMap<u64, PrRuntimeEntry>;

#[derive(Debug, Clone, Default)]
pub struct RuntimeUpdate {
    pub prs: Vec<TrackedPullRequest>,
    pub next_state: PrRuntimeMap,
    /// PRs absent from the prior state. Always empty on the very first scan.
    pub new_prs: Vec<u64>,
    pub sha_changed: usize,
    pub review_decision_changed: usize,
}

pub struct RuntimeStateTracker;

impl RuntimeStateTracker {
    /// `prior` is `None` when no scan has ever persisted runtime state.
    pub fn track(prs: &[PullRequest], prior: Option<&PrRuntimeMap>, now: DateTime<Utc>) -> RuntimeUpdate {
        let mut update = RuntimeUpdate::default();

        for pr in prs {
            let approved = pr.review_decision.is_approved();
            let previous = prior.and_then(|state| state.get(&pr.number));

            let (no_update_streak, no_update_hours, approved_at) = match previous {
                None => {
                    if prior.is_some() {
                        update.new_prs.push(pr.number);
                    }
                    (1, 0.0, approved.then_some(now))
                }
                Some(prev) => {
                    let sha_changed = prev.head_sha != pr.head_sha;
                    let review_changed = prev.review_decision != pr.review_decision;
                    if sha_changed {
                        update.sha_changed += 1;
                    }
                    if review_changed {
                        update.review_decision_changed += 1;
                    }

                    let approved_at = if !approved {
                        None
                    } else if prev.review_decision.is_approved() {
                        prev.approved_at.or(Some(now))
                    } else {
                        Some(now)
                    };

                    if sha_changed || review_changed {
                        debug!(
                            "PR #{} changed (sha: {}, review decision: {}), resetting streak",
                            pr.number, sha_changed, review_changed
                        );
                        (1, 0.0, approved_at)
                    } else {
                        let elapsed = prev.observed_at.map_or(0.0, |at| hours_between(at, now));
                        (
                            prev.no_update_streak.max(1).saturating_add(1),
                            prev.no_update_hours.max(0.0) + elapsed,
                            approved_at,
                        )
                    }
                }
            };

            let approved_but_unmerged_hours = approved_at.map_or(0.0, |at| hours_between(at, now));

            update.next_state.insert(
                pr.number,
                PrRuntimeEntry {
                    head_sha: pr.head_sha.clone(),
                    review_decision: pr.review_decision.clone(),
                    no_update_streak,
                    no_update_hours,
                    approved_at,
                    observed_at: Some(now),
                },
            );

            update.prs.push(TrackedPullRequest {
                number: pr.number,
                title: pr.title.clone(),
                url: pr.url.clone(),
                head_sha: pr.head_sha.clone(),
                head_ref_name: pr.head_ref_name.clone(),
                review_decision: pr.review_decision.clone(),
                updated_at: pr.updated_at.clone(),
                author: pr.author.clone(),
                unchanged_hours: unchanged_hours(pr, now),
                no_update_streak,
                no_update_hours,
                approved_at,
                approved_but_unmerged_hours,
            });
        }

        update
    }
}
