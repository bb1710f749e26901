use async_trait::async_trait;
use octocrab::models::CommentId;
use octocrab::Octocrab;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{MonitorError, Result};
use crate::github::tracker::Tracker;
use crate::github::types::{Comment, Issue, PullRequest, ReviewDecision};

const PAGE_SIZE: u8 = 100;

const ISSUES_QUERY: &str = r#"
query($owner: String!, $name: String!, $after: String, $labels: [String!]) {
  repository(owner: $owner, name: $name) {
    issues(first: 100, after: $after, states: OPEN, labels: $labels) {
      pageInfo { hasNextPage endCursor }
      nodes {
        number
        title
        url
        body
        labels(first: 50) { nodes { name } }
        assignees(first: 20) { nodes { login } }
      }
    }
  }
}"#;

const PULL_REQUESTS_QUERY: &str = r#"
query($owner: String!, $name: String!, $after: String) {
  repository(owner: $owner, name: $name) {
    pullRequests(first: 100, after: $after, states: OPEN) {
      pageInfo { hasNextPage endCursor }
      nodes {
        number
        title
        url
        headRefOid
        headRefName
        reviewDecision
        updatedAt
        author { login }
      }
    }
  }
}"#;

const PR_STATE_QUERY: &str = r#"
query($owner: String!, $name: String!, $number: Int!) {
  repository(owner: $owner, name: $name) {
    pullRequest(number: $number) { state }
  }
}"#;

/// GitHub-backed tracker scoped to one repository.
#[derive(Clone)]
pub struct GitHubClient {
    client: Octocrab,
    owner: String,
    repo: String,
}

impl GitHubClient {
    /// Build a client from a personal token and an `owner/name` slug.
    pub fn new(token: &str, repo_slug: &str, api_url: Option<&str>) -> Result<Self> {
        let (owner, repo) = split_repo_slug(repo_slug)?;

        let mut builder = Octocrab::builder().personal_token(token.to_string());
        if let Some(url) = api_url {
            builder = builder.base_uri(url).map_err(|e| {
                MonitorError::ConfigError(format!("Invalid API URL {}: {}", url, e))
            })?;
        }
        let client = builder
            .build()
            .map_err(|e| MonitorError::GitHubError(format!("Failed to create GitHub client: {}", e)))?;

        Ok(Self {
            client,
            owner,
            repo,
        })
    }

    pub fn from_octocrab(client: Octocrab, owner: &str, repo: &str) -> Self {
        Self {
            client,
            owner: owner.to_string(),
            repo: repo.to_string(),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    async fn graphql<T: DeserializeOwned + Send>(&self, query: &str, variables: Value) -> Result<T> {
        let payload = json!({ "query": query, "variables": variables });
        let response: GraphQlResponse<T> = self.client.graphql(&payload).await?;

        if let Some(errors) = response.errors.filter(|e| !e.is_empty()) {
            let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
            return Err(MonitorError::graphql(&messages));
        }

        response
            .data
            .ok_or_else(|| MonitorError::GitHubError("GraphQL response carried no data".to_string()))
    }
}

pub fn split_repo_slug(slug: &str) -> Result<(String, String)> {
    match slug.split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => Err(MonitorError::ConfigError(format!(
            "Repository must be given as owner/name, got {:?}",
            slug
        ))),
    }
}

#[async_trait]
impl Tracker for GitHubClient {
    async fn list_issues(&self, label: Option<&str>) -> Result<Vec<Issue>> {
        let labels = label.map(|l| vec![l.to_string()]);
        let mut issues = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let data: RepositoryData<IssuesData> = self
                .graphql(
                    ISSUES_QUERY,
                    json!({
                        "owner": self.owner,
                        "name": self.repo,
                        "after": after,
                        "labels": labels,
                    }),
                )
                .await?;
            let connection = data.repository.issues;

            issues.extend(connection.nodes.into_iter().map(IssueNode::into_issue));

            match next_cursor(connection.page_info) {
                Some(cursor) => after = Some(cursor),
                None => break,
            }
        }

        debug!("Listed {} open issues in {}/{}", issues.len(), self.owner, self.repo);
        Ok(issues)
    }

    async fn list_pull_requests(&self) -> Result<Vec<PullRequest>> {
        let mut prs = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let data: RepositoryData<PullRequestsData> = self
                .graphql(
                    PULL_REQUESTS_QUERY,
                    json!({ "owner": self.owner, "name": self.repo, "after": after }),
                )
                .await?;
            let connection = data.repository.pull_requests;

            prs.extend(connection.nodes.into_iter().map(PullRequestNode::into_pull_request));

            match next_cursor(connection.page_info) {
                Some(cursor) => after = Some(cursor),
                None => break,
            }
        }

        debug!("Listed {} open PRs in {}/{}", prs.len(), self.owner, self.repo);
        Ok(prs)
    }

    async fn pr_lifecycle_state(&self, number: u64) -> Result<String> {
        let data: RepositoryData<PullRequestStateData> = self
            .graphql(
                PR_STATE_QUERY,
                json!({ "owner": self.owner, "name": self.repo, "number": number }),
            )
            .await?;

        data.repository
            .pull_request
            .map(|pr| pr.state)
            .ok_or_else(|| MonitorError::GitHubError(format!("PR #{} not found", number)))
    }

    async fn list_comments(&self, target: u64) -> Result<Vec<Comment>> {
        let page = self
            .client
            .issues(&self.owner, &self.repo)
            .list_comments(target)
            .per_page(PAGE_SIZE)
            .send()
            .await?;
        let comments = self.client.all_pages(page).await?;

        Ok(comments
            .into_iter()
            .map(|c| Comment {
                id: c.id.0,
                body: c.body.unwrap_or_default(),
            })
            .collect())
    }

    async fn create_comment(&self, target: u64, body: &str) -> Result<Comment> {
        let created = self
            .client
            .issues(&self.owner, &self.repo)
            .create_comment(target, body)
            .await?;

        Ok(Comment {
            id: created.id.0,
            body: created.body.unwrap_or_default(),
        })
    }

    async fn update_comment(&self, comment_id: u64, body: &str) -> Result<()> {
        self.client
            .issues(&self.owner, &self.repo)
            .update_comment(CommentId(comment_id), body)
            .await?;
        Ok(())
    }
}

fn next_cursor(page_info: PageInfo) -> Option<String> {
    if page_info.has_next_page {
        page_info.end_cursor
    } else {
        None
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct RepositoryData<T> {
    repository: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Connection<T> {
    #[serde(rename = "pageInfo")]
    page_info: PageInfo,
    nodes: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct NodeList<T> {
    nodes: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct IssuesData {
    issues: Connection<IssueNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullRequestsData {
    pull_requests: Connection<PullRequestNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullRequestStateData {
    pull_request: Option<PullRequestStateNode>,
}

#[derive(Debug, Deserialize)]
struct PullRequestStateNode {
    state: String,
}

#[derive(Debug, Deserialize)]
struct LabelNode {
    name: String,
}

#[derive(Debug, Deserialize)]
struct LoginNode {
    login: String,
}

#[derive(Debug, Deserialize)]
struct IssueNode {
    number: u64,
    title: String,
    url: String,
    body: Option<String>,
    labels: Option<NodeList<LabelNode>>,
    assignees: Option<NodeList<LoginNode>>,
}

impl IssueNode {
    fn into_issue(self) -> Issue {
        Issue {
            number: self.number,
            title: self.title,
            url: self.url,
            body: self.body.unwrap_or_default(),
            labels: self
                .labels
                .map(|l| l.nodes.into_iter().map(|n| n.name).collect())
                .unwrap_or_default(),
            assignees: self
                .assignees
                .map(|a| a.nodes.into_iter().map(|n| n.login).collect())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullRequestNode {
    number: u64,
    title: String,
    url: String,
    head_ref_oid: String,
    head_ref_name: String,
    review_decision: Option<String>,
    updated_at: Option<String>,
    author: Option<LoginNode>,
}

impl PullRequestNode {
    fn into_pull_request(self) -> PullRequest {
        PullRequest {
            number: self.number,
            title: self.title,
            url: self.url,
            head_sha: self.head_ref_oid,
            head_ref_name: self.head_ref_name,
            review_decision: ReviewDecision::parse(self.review_decision.as_deref()),
            updated_at: self.updated_at,
            author: self.author.map(|a| a.login),
        }
    }
}
