//! GitHub Client Tests
//!
//! GraphQL reads and REST comment writes of the octocrab-backed tracker
//! against a mock server.

use review_monitor::github::{upsert_comment, GitHubClient, ReviewDecision, Tracker, UpsertOutcome};
use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn client_for(server: &MockServer) -> GitHubClient {
    GitHubClient::new("test-token", "octo/widgets", Some(&server.uri())).expect("client builds")
}

fn pr_node(number: u64, sha: &str) -> Value {
    json!({
        "number": number,
        "title": format!("PR {}", number),
        "url": format!("https://github.com/octo/widgets/pull/{}", number),
        "headRefOid": sha,
        "headRefName": format!("branch-{}", number),
        "reviewDecision": "REVIEW_REQUIRED",
        "updatedAt": "2026-02-21T00:00:00Z",
        "author": {"login": "alice"}
    })
}

/// REST issue comment as GitHub returns it.
fn comment_json(server: &MockServer, id: u64, body: &str) -> Value {
    let base = server.uri();
    json!({
        "id": id,
        "node_id": format!("IC_{}", id),
        "url": format!("{}/repos/octo/widgets/issues/comments/{}", base, id),
        "html_url": format!("https://github.com/octo/widgets/issues/208#issuecomment-{}", id),
        "issue_url": format!("{}/repos/octo/widgets/issues/208", base),
        "body": body,
        "author_association": "MEMBER",
        "user": {
            "login": "monitor-bot",
            "id": 42,
            "node_id": "U_42",
            "avatar_url": "https://avatars.githubusercontent.com/u/42",
            "gravatar_id": "",
            "url": "https://api.github.com/users/monitor-bot",
            "html_url": "https://github.com/monitor-bot",
            "followers_url": "https://api.github.com/users/monitor-bot/followers",
            "following_url": "https://api.github.com/users/monitor-bot/following{/other_user}",
            "gists_url": "https://api.github.com/users/monitor-bot/gists{/gist_id}",
            "starred_url": "https://api.github.com/users/monitor-bot/starred{/owner}{/repo}",
            "subscriptions_url": "https://api.github.com/users/monitor-bot/subscriptions",
            "organizations_url": "https://api.github.com/users/monitor-bot/orgs",
            "repos_url": "https://api.github.com/users/monitor-bot/repos",
            "events_url": "https://api.github.com/users/monitor-bot/events{/privacy}",
            "received_events_url": "https://api.github.com/users/monitor-bot/received_events",
            "type": "User",
            "site_admin": false
        },
        "created_at": "2026-02-20T00:00:00Z",
        "updated_at": "2026-02-21T00:00:00Z"
    })
}

#[tokio::test]
async fn test_pr_lifecycle_state() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("pullRequest(number"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"repository": {"pullRequest": {"state": "MERGED"}}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    assert_eq!(client.pr_lifecycle_state(209).await?, "MERGED");
    Ok(())
}

#[tokio::test]
async fn test_missing_pr_is_an_error() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"repository": {"pullRequest": null}}
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    assert!(client.pr_lifecycle_state(404).await.is_err());
    Ok(())
}

#[tokio::test]
async fn test_graphql_errors_surface() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": null,
            "errors": [{"message": "Could not resolve to a Repository"}]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client.list_pull_requests().await.unwrap_err();
    assert!(err.to_string().contains("Could not resolve to a Repository"));
    Ok(())
}

#[tokio::test]
async fn test_list_pull_requests() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("pullRequests("))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"repository": {"pullRequests": {
                "pageInfo": {"hasNextPage": false, "endCursor": null},
                "nodes": [
                    {
                        "number": 208,
                        "title": "Tighten review gate",
                        "url": "https://github.com/octo/widgets/pull/208",
                        "headRefOid": "aaaaaa1111111111",
                        "headRefName": "review-gate",
                        "reviewDecision": "APPROVED",
                        "updatedAt": "2026-02-21T00:00:00Z",
                        "author": {"login": "alice"}
                    },
                    {
                        "number": 209,
                        "title": "Draft",
                        "url": "https://github.com/octo/widgets/pull/209",
                        "headRefOid": "bbbbbb2222222222",
                        "headRefName": "draft",
                        "reviewDecision": null,
                        "updatedAt": null,
                        "author": null
                    }
                ]
            }}}
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let prs = client.list_pull_requests().await?;

    assert_eq!(prs.len(), 2);
    assert_eq!(prs[0].number, 208);
    assert_eq!(prs[0].review_decision, ReviewDecision::Approved);
    assert_eq!(prs[0].author.as_deref(), Some("alice"));
    assert_eq!(prs[1].review_decision, ReviewDecision::Unset);
    assert!(prs[1].updated_at.is_none());
    assert!(prs[1].author.is_none());
    Ok(())
}

#[tokio::test]
async fn test_list_pull_requests_follows_cursor() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("pullRequests("))
        .and(body_string_contains("\"after\":null"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"repository": {"pullRequests": {
                "pageInfo": {"hasNextPage": true, "endCursor": "c1"},
                "nodes": [pr_node(301, "3010000"), pr_node(302, "3020000")]
            }}}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("pullRequests("))
        .and(body_string_contains("\"after\":\"c1\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"repository": {"pullRequests": {
                "pageInfo": {"hasNextPage": false, "endCursor": "c2"},
                "nodes": [pr_node(303, "3030000")]
            }}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let prs = client.list_pull_requests().await?;

    let numbers: Vec<_> = prs.iter().map(|pr| pr.number).collect();
    assert_eq!(numbers, vec![301, 302, 303]);
    assert_eq!(prs[2].head_sha, "3030000");
    assert_eq!(prs[0].review_decision, ReviewDecision::Other("REVIEW_REQUIRED".to_string()));
    Ok(())
}

#[tokio::test]
async fn test_list_issues_maps_labels_and_assignees() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("issues("))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"repository": {"issues": {
                "pageInfo": {"hasNextPage": false, "endCursor": null},
                "nodes": [
                    {
                        "number": 12,
                        "title": "Follow up on review",
                        "url": "https://github.com/octo/widgets/issues/12",
                        "body": "Source PR: https://github.com/octo/widgets/pull/208",
                        "labels": {"nodes": [{"name": "nbs"}, {"name": "bug"}]},
                        "assignees": {"nodes": [{"login": "alice"}, {"login": "bob"}]}
                    },
                    {
                        "number": 13,
                        "title": "Bare issue",
                        "url": "https://github.com/octo/widgets/issues/13",
                        "body": null,
                        "labels": null,
                        "assignees": {"nodes": []}
                    }
                ]
            }}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let issues = client.list_issues(None).await?;

    assert_eq!(issues.len(), 2);
    assert!(issues[0].labels.contains("nbs"));
    assert!(issues[0].labels.contains("bug"));
    let assignees: Vec<_> = issues[0].assignees.iter().map(String::as_str).collect();
    assert_eq!(assignees, vec!["alice", "bob"]);
    assert!(issues[0].body.contains("pull/208"));
    assert!(issues[1].labels.is_empty());
    assert!(issues[1].assignees.is_empty());
    assert_eq!(issues[1].body, "");
    Ok(())
}

#[tokio::test]
async fn test_upsert_updates_marked_comment() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    let marker = "<!-- review-monitor:audit-delta -->";
    Mock::given(method("GET"))
        .and(path("/repos/octo/widgets/issues/208/comments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            comment_json(&server, 900, "unrelated chatter"),
            comment_json(&server, 901, &format!("old delta\n\n{}", marker)),
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/repos/octo/widgets/issues/comments/901"))
        .and(body_string_contains("new delta"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(comment_json(&server, 901, &format!("new delta\n\n{}", marker))),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/octo/widgets/issues/208/comments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(comment_json(&server, 999, "")))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let outcome = upsert_comment(&client, 208, marker, "new delta").await?;

    assert_eq!(outcome, UpsertOutcome::Updated(901));
    Ok(())
}

#[tokio::test]
async fn test_upsert_creates_comment_without_marker() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    let marker = "<!-- review-monitor:digest -->";
    Mock::given(method("GET"))
        .and(path("/repos/octo/widgets/issues/208/comments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            comment_json(&server, 900, "unrelated chatter"),
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/octo/widgets/issues/208/comments"))
        .and(body_string_contains("review-monitor:digest"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(comment_json(&server, 902, &format!("digest\n\n{}", marker))),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let outcome = upsert_comment(&client, 208, marker, "digest").await?;

    assert_eq!(outcome, UpsertOutcome::Created(902));
    Ok(())
}
