//! Entity normalization
//!
//! Turns raw tracker records into the shapes the classifier works on and
//! resolves the `Source PR: <url>/pull/<n>` linkage convention used in issue
//! bodies.

use chrono::{DateTime, Utc};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::debug;

use crate::classification::types::LinkedIssue;
use crate::error::Result;
use crate::github::tracker::Tracker;
use crate::github::types::{Issue, PullRequest};

const SOURCE_PR_PATTERN: &str = r"Source PR:\s*\S+/pull/(\d+)";

fn source_pr_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(SOURCE_PR_PATTERN).expect("linkage pattern compiles"))
}

/// PR number referenced by an issue body, if any. Numbers outside GitHub's
/// `Int` range are treated as no reference.
pub fn source_pr_number(body: &str) -> Option<u64> {
    source_pr_regex()
        .captures(body)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<i32>().ok())
        .filter(|number| *number > 0)
        .map(|number| number as u64)
}

pub fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|value| DateTime::parse_from_rfc3339(value.trim()).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Elapsed hours between two instants, never negative.
pub fn hours_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    let seconds = (later - earlier).num_milliseconds() as f64 / 1000.0;
    (seconds / 3600.0).max(0.0)
}

/// Hours since the PR was last updated; `None` when the age is unknown.
pub fn unchanged_hours(pr: &PullRequest, now: DateTime<Utc>) -> Option<f64> {
    parse_timestamp(pr.updated_at.as_deref()).map(|updated| hours_between(updated, now))
}

/// Per-scan memo of PR lifecycle lookups.
#[derive(Debug, Default)]
pub struct PrStateCache {
    states: HashMap<u64, String>,
    lookups: usize,
}

impl PrStateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of calls that actually reached the tracker.
    pub fn lookups(&self) -> usize {
        self.lookups
    }

    pub async fn state_of<T: Tracker + ?Sized>(&mut self, tracker: &T, number: u64) -> Result<String> {
        if let Some(state) = self.states.get(&number) {
            return Ok(state.clone());
        }
        let state = tracker.pr_lifecycle_state(number).await?.trim().to_uppercase();
        self.lookups += 1;
        self.states.insert(number, state.clone());
        Ok(state)
    }
}

pub struct EntityNormalizer;

impl EntityNormalizer {
    /// Resolve the linkage of every issue, looking up each referenced PR once.
    pub async fn link_issues<T: Tracker + ?Sized>(
        tracker: &T,
        issues: Vec<Issue>,
        cache: &mut PrStateCache,
    ) -> Result<Vec<LinkedIssue>> {
        let mut linked = Vec::with_capacity(issues.len());

        for issue in issues {
            let source_pr_number = source_pr_number(&issue.body);
            let source_pr_state = match source_pr_number {
                Some(number) => Some(cache.state_of(tracker, number).await?),
                None => None,
            };

            debug!(
                "Issue #{} linkage: source PR {:?} state {:?}",
                issue.number, source_pr_number, source_pr_state
            );

            linked.push(LinkedIssue {
                issue,
                source_pr_number,
                source_pr_state,
            });
        }

        Ok(linked)
    }
}
