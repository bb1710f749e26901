use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::github::types::{Issue, ReviewDecision};

/// Compact issue reference stored in snapshot collections.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IssueRef {
    pub number: u64,
    pub title: String,
    pub url: String,
    /// Why the issue is actionable (`missing-source-pr`, `source-pr-merged`, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_pr_number: Option<u64>,
}

/// An issue with its linkage resolved against the tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkedIssue {
    pub issue: Issue,
    pub source_pr_number: Option<u64>,
    /// Lifecycle state of the linked PR, as reported by the tracker.
    pub source_pr_state: Option<String>,
}

impl LinkedIssue {
    /// Bound issues point at a PR that is still open.
    pub fn is_bound(&self) -> bool {
        self.source_pr_number.is_some()
            && self
                .source_pr_state
                .as_deref()
                .is_some_and(|state| state.eq_ignore_ascii_case("OPEN"))
    }

    /// Reason tag for an actionable issue, `None` when bound.
    pub fn unbound_reason(&self) -> Option<String> {
        if self.is_bound() {
            return None;
        }
        match (&self.source_pr_number, &self.source_pr_state) {
            (Some(_), Some(state)) => Some(format!("source-pr-{}", state.to_lowercase())),
            (Some(_), None) => Some("source-pr-unknown".to_string()),
            (None, _) => Some("missing-source-pr".to_string()),
        }
    }

    pub fn to_ref(&self) -> IssueRef {
        IssueRef {
            number: self.issue.number,
            title: self.issue.title.clone(),
            url: self.issue.url.clone(),
            reason: self.unbound_reason(),
            source_pr_number: self.source_pr_number,
        }
    }
}

/// A pull request with the runtime fields derived across scans.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackedPullRequest {
    pub number: u64,
    pub title: String,
    pub url: String,
    pub head_sha: String,
    pub head_ref_name: String,
    pub review_decision: ReviewDecision,
    pub updated_at: Option<String>,
    pub author: Option<String>,
    /// Hours since `updated_at`; `None` when the timestamp is missing or unparseable.
    pub unchanged_hours: Option<f64>,
    pub no_update_streak: u32,
    pub no_update_hours: f64,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_but_unmerged_hours: f64,
}

impl TrackedPullRequest {
    pub fn has_author(&self) -> bool {
        self.author.as_deref().is_some_and(|login| !login.trim().is_empty())
    }

    pub fn short_sha(&self) -> &str {
        short_sha(&self.head_sha)
    }
}

pub fn short_sha(sha: &str) -> &str {
    match sha.char_indices().nth(7) {
        Some((idx, _)) => &sha[..idx],
        None => sha,
    }
}

/// Compact PR reference stored in the classified collections.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrRef {
    pub number: u64,
    pub title: String,
    pub url: String,
    pub author: Option<String>,
    pub review_decision: ReviewDecision,
    pub unchanged_hours: Option<f64>,
    pub approved_but_unmerged_hours: f64,
}

impl From<&TrackedPullRequest> for PrRef {
    fn from(pr: &TrackedPullRequest) -> Self {
        Self {
            number: pr.number,
            title: pr.title.clone(),
            url: pr.url.clone(),
            author: pr.author.clone(),
            review_decision: pr.review_decision.clone(),
            unchanged_hours: pr.unchanged_hours,
            approved_but_unmerged_hours: pr.approved_but_unmerged_hours,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linked(source: Option<u64>, state: Option<&str>) -> LinkedIssue {
        LinkedIssue {
            issue: Issue {
                number: 1,
                title: "Follow-up".to_string(),
                url: "https://example.com/1".to_string(),
                body: String::new(),
                labels: Default::default(),
                assignees: Default::default(),
            },
            source_pr_number: source,
            source_pr_state: state.map(str::to_string),
        }
    }

    #[test]
    fn test_unbound_reasons() {
        assert!(linked(Some(208), Some("OPEN")).is_bound());
        assert_eq!(linked(Some(208), Some("OPEN")).unbound_reason(), None);
        assert_eq!(
            linked(None, None).unbound_reason().as_deref(),
            Some("missing-source-pr")
        );
        assert_eq!(
            linked(Some(208), Some("MERGED")).unbound_reason().as_deref(),
            Some("source-pr-merged")
        );
    }

    #[test]
    fn test_short_sha() {
        assert_eq!(short_sha("aaaaaa111111"), "aaaaaa1");
        assert_eq!(short_sha("abc"), "abc");
    }
}
