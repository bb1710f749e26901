//! Tracker seam
//!
//! The monitor only needs a handful of read/write operations from the issue
//! tracker. They are collected behind [`Tracker`] so scans can run against
//! GitHub or against an in-memory fake.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::Result;
use crate::github::types::{Comment, Issue, PullRequest};

#[async_trait]
pub trait Tracker: Send + Sync {
    /// All open issues, optionally restricted to one label.
    async fn list_issues(&self, label: Option<&str>) -> Result<Vec<Issue>>;

    /// All open pull requests.
    async fn list_pull_requests(&self) -> Result<Vec<PullRequest>>;

    /// Lifecycle state of a single PR (`OPEN`, `CLOSED`, `MERGED`).
    async fn pr_lifecycle_state(&self, number: u64) -> Result<String>;

    async fn list_comments(&self, target: u64) -> Result<Vec<Comment>>;

    async fn create_comment(&self, target: u64, body: &str) -> Result<Comment>;

    async fn update_comment(&self, comment_id: u64, body: &str) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created(u64),
    Updated(u64),
}

impl UpsertOutcome {
    pub fn comment_id(&self) -> u64 {
        match self {
            Self::Created(id) | Self::Updated(id) => *id,
        }
    }
}

/// Create or update the single comment on `target` that carries `marker`.
///
/// The marker is appended to the body when the body does not already contain
/// it. Not safe against concurrent invocations.
pub async fn upsert_comment<T: Tracker + ?Sized>(
    tracker: &T,
    target: u64,
    marker: &str,
    body: &str,
) -> Result<UpsertOutcome> {
    let body = if body.contains(marker) {
        body.to_string()
    } else {
        format!("{}\n\n{}", body.trim_end(), marker)
    };

    let existing = tracker.list_comments(target).await?;
    if let Some(comment) = existing.iter().find(|c| c.body.contains(marker)) {
        debug!("Updating comment {} on #{} in place", comment.id, target);
        tracker.update_comment(comment.id, &body).await?;
        return Ok(UpsertOutcome::Updated(comment.id));
    }

    let created = tracker.create_comment(target, &body).await?;
    info!("Created comment {} on #{}", created.id, target);
    Ok(UpsertOutcome::Created(created.id))
}
