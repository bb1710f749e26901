pub mod client;
pub mod tracker;
pub mod types;

pub use client::GitHubClient;
pub use tracker::{upsert_comment, Tracker, UpsertOutcome};
pub use types::{Comment, Issue, PullRequest, ReviewDecision};
