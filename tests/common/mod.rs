#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use review_monitor::config::MonitorConfig;
use review_monitor::error::{MonitorError, Result};
use review_monitor::github::{Comment, Issue, PullRequest, ReviewDecision, Tracker};
use review_monitor::state::{MonitorState, StateStore};

/// Fixed "now" for scans in tests
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 22, 6, 0, 0).unwrap()
}

pub fn issue(number: u64, title: &str, labels: &[&str], body: &str) -> Issue {
    Issue {
        number,
        title: title.to_string(),
        url: format!("https://github.com/octo/widgets/issues/{}", number),
        body: body.to_string(),
        labels: labels.iter().map(|l| l.to_string()).collect(),
        ..Issue::default()
    }
}

pub fn pull_request(
    number: u64,
    sha: &str,
    decision: ReviewDecision,
    hours_ago: i64,
    author: Option<&str>,
) -> PullRequest {
    PullRequest {
        number,
        title: format!("PR {}", number),
        url: format!("https://github.com/octo/widgets/pull/{}", number),
        head_sha: sha.to_string(),
        head_ref_name: format!("feature-{}", number),
        review_decision: decision,
        updated_at: Some((now() - Duration::hours(hours_ago)).to_rfc3339()),
        author: author.map(str::to_string),
    }
}

#[derive(Default)]
struct FakeData {
    issues: Vec<Issue>,
    pull_requests: Vec<PullRequest>,
    pr_states: HashMap<u64, String>,
    comments: HashMap<u64, Vec<Comment>>,
    next_comment_id: u64,
    state_lookups: usize,
    comment_writes: usize,
    fail_listing: bool,
}

/// In-memory tracker with call counters
#[derive(Default)]
pub struct FakeTracker {
    data: Mutex<FakeData>,
}

impl FakeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_issues(&self, issues: Vec<Issue>) {
        self.data.lock().unwrap().issues = issues;
    }

    pub fn set_pull_requests(&self, prs: Vec<PullRequest>) {
        self.data.lock().unwrap().pull_requests = prs;
    }

    pub fn set_pr_state(&self, number: u64, state: &str) {
        self.data.lock().unwrap().pr_states.insert(number, state.to_string());
    }

    pub fn fail_listing(&self, fail: bool) {
        self.data.lock().unwrap().fail_listing = fail;
    }

    pub fn state_lookups(&self) -> usize {
        self.data.lock().unwrap().state_lookups
    }

    pub fn comment_writes(&self) -> usize {
        self.data.lock().unwrap().comment_writes
    }

    pub fn comments_on(&self, target: u64) -> Vec<Comment> {
        self.data
            .lock()
            .unwrap()
            .comments
            .get(&target)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl Tracker for FakeTracker {
    async fn list_issues(&self, label: Option<&str>) -> Result<Vec<Issue>> {
        let data = self.data.lock().unwrap();
        if data.fail_listing {
            return Err(MonitorError::GitHubError("tracker unavailable".to_string()));
        }
        Ok(data
            .issues
            .iter()
            .filter(|i| label.map_or(true, |l| i.has_label(l)))
            .cloned()
            .collect())
    }

    async fn list_pull_requests(&self) -> Result<Vec<PullRequest>> {
        let data = self.data.lock().unwrap();
        if data.fail_listing {
            return Err(MonitorError::GitHubError("tracker unavailable".to_string()));
        }
        Ok(data.pull_requests.clone())
    }

    async fn pr_lifecycle_state(&self, number: u64) -> Result<String> {
        let mut data = self.data.lock().unwrap();
        data.state_lookups += 1;
        data.pr_states
            .get(&number)
            .cloned()
            .ok_or_else(|| MonitorError::GitHubError(format!("PR #{} not found", number)))
    }

    async fn list_comments(&self, target: u64) -> Result<Vec<Comment>> {
        Ok(self.comments_on(target))
    }

    async fn create_comment(&self, target: u64, body: &str) -> Result<Comment> {
        let mut data = self.data.lock().unwrap();
        data.next_comment_id += 1;
        data.comment_writes += 1;
        let comment = Comment {
            id: data.next_comment_id,
            body: body.to_string(),
        };
        data.comments.entry(target).or_default().push(comment.clone());
        Ok(comment)
    }

    async fn update_comment(&self, comment_id: u64, body: &str) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        data.comment_writes += 1;
        for comments in data.comments.values_mut() {
            if let Some(comment) = comments.iter_mut().find(|c| c.id == comment_id) {
                comment.body = body.to_string();
                return Ok(());
            }
        }
        Err(MonitorError::GitHubError(format!("comment {} not found", comment_id)))
    }
}

/// State store kept in memory, counting saves
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<Option<MonitorState>>,
    saves: Mutex<usize>,
}

impl MemoryStore {
    pub fn saves(&self) -> usize {
        *self.saves.lock().unwrap()
    }

    pub fn current(&self) -> Option<MonitorState> {
        self.state.lock().unwrap().clone()
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> Result<MonitorState> {
        Ok(self.state.lock().unwrap().clone().unwrap_or_default())
    }

    fn save(&self, state: &MonitorState) -> Result<()> {
        *self.state.lock().unwrap() = Some(state.clone());
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }
}

pub fn test_config() -> MonitorConfig {
    MonitorConfig {
        repo: Some("octo/widgets".to_string()),
        audit_pr: Some(208),
        digest_issue: Some(500),
        ..MonitorConfig::default()
    }
}
