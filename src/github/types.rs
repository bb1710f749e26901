use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Review decision as reported by the tracker.
///
/// Values other than `CHANGES_REQUESTED` and `APPROVED` are carried through
/// verbatim so snapshots keep whatever the tracker said.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum ReviewDecision {
    #[default]
    Unset,
    ChangesRequested,
    Approved,
    Other(String),
}

impl ReviewDecision {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Self::Unset,
            Some("CHANGES_REQUESTED") => Self::ChangesRequested,
            Some("APPROVED") => Self::Approved,
            Some(other) => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Unset => "",
            Self::ChangesRequested => "CHANGES_REQUESTED",
            Self::Approved => "APPROVED",
            Self::Other(value) => value,
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }

    pub fn is_changes_requested(&self) -> bool {
        matches!(self, Self::ChangesRequested)
    }
}

impl From<Option<String>> for ReviewDecision {
    fn from(raw: Option<String>) -> Self {
        Self::parse(raw.as_deref())
    }
}

impl From<ReviewDecision> for Option<String> {
    fn from(decision: ReviewDecision) -> Self {
        match decision {
            ReviewDecision::Unset => None,
            other => Some(other.as_str().to_string()),
        }
    }
}

impl fmt::Display for ReviewDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => write!(f, "UNSET"),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

/// An open issue as read from the tracker.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub labels: BTreeSet<String>,
    #[serde(default)]
    pub assignees: BTreeSet<String>,
}

impl Issue {
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains(label)
    }
}

/// An open pull request as read from the tracker, before any runtime tracking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub url: String,
    pub head_sha: String,
    #[serde(default)]
    pub head_ref_name: String,
    #[serde(default)]
    pub review_decision: ReviewDecision,
    /// Raw tracker timestamp; parsed by the normalizer.
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

/// A comment on an issue or pull request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: u64,
    pub body: String,
}
