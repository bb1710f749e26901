//! Text rendering of snapshots: the console summary, the skip summary and the
//! two marker comment bodies.

use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::BTreeSet;

use crate::classification::types::{short_sha, IssueRef, PrRef};
use crate::policy::notification::{AUDIT_DELTA_MARKER, DIGEST_MARKER};
use crate::state::snapshot::{count_keys, Snapshot};

/// Counts shown in the audit-delta comment, with their labels.
fn delta_rows(watch_label: &str) -> Vec<(&'static str, String)> {
    vec![
        (count_keys::OPEN, "Open issues requiring handling".to_string()),
        (count_keys::NBS_UNBOUND, format!("Unbound {} issues", watch_label)),
        (count_keys::CHANGE_REQUESTS, "Open PRs with CHANGES_REQUESTED".to_string()),
        (count_keys::STALE_OPEN_PRS, "Stale open PR watchdog".to_string()),
        (count_keys::STALE_OPEN_PRS_DIGEST, "Low-priority digest candidates".to_string()),
        (count_keys::OWNER_PING_CANDIDATES, "Owner ping candidates".to_string()),
        (count_keys::APPROVED_UNMERGED_PRS, "Approved but unmerged".to_string()),
        (count_keys::STABLE_TERMINAL_PRS, "Stable-terminal PRs".to_string()),
    ]
}

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn format_optional_timestamp(ts: Option<DateTime<Utc>>) -> String {
    ts.map(format_timestamp).unwrap_or_else(|| "n/a".to_string())
}

fn format_hours(hours: Option<f64>) -> String {
    match hours {
        Some(h) => format!("{:.1}h", h),
        None => "unknown age".to_string(),
    }
}

/// Count for `key`, falling back to the collection length for documents that
/// predate the count table.
fn count_or_len<T>(snapshot: &Snapshot, key: &str, items: &[T]) -> u64 {
    snapshot.counts.lookup(key).unwrap_or(items.len() as u64)
}

fn signal_line(signals: &BTreeSet<String>) -> String {
    if signals.is_empty() {
        "none".to_string()
    } else {
        signals.iter().cloned().collect::<Vec<_>>().join(", ")
    }
}

fn push_issue_lines(lines: &mut Vec<String>, issues: &[IssueRef], indent: &str) {
    for issue in issues {
        match &issue.reason {
            Some(reason) => lines.push(format!(
                "{}- #{} {} [{}] ({})",
                indent, issue.number, issue.title, reason, issue.url
            )),
            None => lines.push(format!("{}- #{} {} ({})", indent, issue.number, issue.title, issue.url)),
        }
    }
}

fn push_pr_lines(lines: &mut Vec<String>, prs: &[PrRef]) {
    for pr in prs {
        let mut line = format!("- #{} {} ({})", pr.number, pr.title, format_hours(pr.unchanged_hours));
        if let Some(author) = pr.author.as_deref().filter(|a| !a.is_empty()) {
            line.push_str(&format!(" @{}", author));
        }
        lines.push(line);
    }
}

/// Human-readable summary of one snapshot. Works for legacy snapshots that
/// only carry the `assigned` names.
pub fn summarize(snapshot: &Snapshot) -> String {
    let label = snapshot.watch_label();
    let mut lines = Vec::new();

    lines.push(format!("Review monitor scan at {}", format_timestamp(snapshot.run_at)));

    lines.push(format!(
        "Open issues requiring handling: {}",
        count_or_len(snapshot, count_keys::OPEN, &snapshot.open)
    ));
    push_issue_lines(&mut lines, &snapshot.open, "");

    lines.push(format!(
        "Open {} issues: {}",
        label,
        count_or_len(snapshot, count_keys::NBS, &snapshot.nbs)
    ));
    lines.push(format!(
        "- Unbound {} issues (not linked to OPEN source PR): {}",
        label,
        count_or_len(snapshot, count_keys::NBS_UNBOUND, &snapshot.nbs_unbound)
    ));
    push_issue_lines(&mut lines, &snapshot.nbs_unbound, "  ");

    lines.push(format!(
        "Open PRs: {}",
        count_or_len(snapshot, count_keys::OPEN_PRS, &snapshot.open_prs)
    ));

    let sections: [(&str, &str, &[PrRef]); 6] = [
        (count_keys::CHANGE_REQUESTS, "Open PRs with CHANGES_REQUESTED", &snapshot.change_requests),
        (count_keys::STALE_OPEN_PRS, "Stale open PR watchdog", &snapshot.stale_open_prs),
        (
            count_keys::STALE_OPEN_PRS_DIGEST,
            "Low-priority digest candidates",
            &snapshot.stale_open_prs_digest,
        ),
        (count_keys::OWNER_PING_CANDIDATES, "Owner ping candidates", &snapshot.owner_ping_candidates),
        (count_keys::APPROVED_UNMERGED_PRS, "Approved but unmerged", &snapshot.approved_unmerged_prs),
        (count_keys::NEW_PRS, "New PRs", &snapshot.new_prs),
    ];
    for (key, title, prs) in sections {
        lines.push(format!("{}: {}", title, count_or_len(snapshot, key, prs)));
        push_pr_lines(&mut lines, prs);
    }
    lines.push(format!(
        "Stable-terminal PRs: {}",
        count_or_len(snapshot, count_keys::STABLE_TERMINAL_PRS, &snapshot.stable_terminal_prs)
    ));

    lines.push(format!("Signals: {}", signal_line(&snapshot.signals)));
    if !snapshot.change_detection_source.is_empty() {
        lines.push(format!(
            "Change detection: {} ({})",
            snapshot.change_detection_source,
            if snapshot.changed { "changed" } else { "unchanged" }
        ));
    }
    lines.push(format!(
        "Polling: {} every {} min, nextActionAt: {}",
        snapshot.polling_mode,
        snapshot.polling_interval_minutes,
        format_optional_timestamp(snapshot.next_action_at)
    ));
    lines.push(format!(
        "cleanRunStreak: {} (mergeReady: {})",
        snapshot.clean_run_streak, snapshot.merge_ready
    ));

    lines.join("\n")
}

/// Body of the audit-delta comment posted on `audit_pr`.
pub fn build_audit_delta_comment(audit_pr: u64, current: &Snapshot, previous: Option<&Snapshot>) -> String {
    let mut lines = vec![
        format!("### Review monitor audit delta (#{})", audit_pr),
        AUDIT_DELTA_MARKER.to_string(),
        String::new(),
    ];

    for (key, title) in delta_rows(current.watch_label()) {
        let now = current.counts.get(key);
        let delta = match previous {
            Some(prev) => format!("{:+}", now as i64 - prev.counts.get(key) as i64),
            None => "n/a".to_string(),
        };
        lines.push(format!("- {}: {} (delta {})", title, now, delta));
    }

    lines.push(String::new());
    lines.push(format!("Signals: {}", signal_line(&current.signals)));

    if !current.open_prs.is_empty() {
        lines.push("Head SHAs:".to_string());
        for pr in &current.open_prs {
            lines.push(format!("- #{} {}", pr.number, pr.short_sha()));
        }
    }

    lines.push(format!("runAt: {}", format_timestamp(current.run_at)));
    lines.push(format!("nextActionAt: {}", format_optional_timestamp(current.next_action_at)));
    lines.join("\n")
}

/// Body of the stale PR digest comment.
pub fn build_digest_comment(snapshot: &Snapshot) -> String {
    let mut lines = vec![
        "### Stale PR digest".to_string(),
        DIGEST_MARKER.to_string(),
        String::new(),
        format!(
            "Low-priority digest candidates: {}",
            snapshot.stale_open_prs_digest.len()
        ),
    ];

    for pr in &snapshot.stale_open_prs_digest {
        let mut line = format!(
            "- #{} {} (unchanged {}, {})",
            pr.number,
            pr.title,
            format_hours(pr.unchanged_hours),
            pr.review_decision
        );
        if snapshot.is_stable_terminal(pr.number) {
            line.push_str(" [stable-terminal]");
        }
        lines.push(line);
    }

    lines.push(String::new());
    lines.push(format!("runAt: {}", format_timestamp(snapshot.run_at)));
    lines.join("\n")
}

/// Summary printed for an unchanged scan that the throttle lets through.
pub fn build_skip_summary(
    previous: Option<&Snapshot>,
    current: &Snapshot,
    consecutive_skips: u32,
    escalated: bool,
) -> String {
    let prefix = if escalated { "[ESCALATED] " } else { "" };
    let mut lines = vec![format!(
        "{}No changes since previous scan ({})",
        prefix,
        format_timestamp(current.run_at)
    )];

    let before = previous.map(Snapshot::head_shas).unwrap_or_default();
    let after = current.head_shas();
    let numbers: BTreeSet<u64> = before.keys().chain(after.keys()).copied().collect();

    lines.push("headSha previous/current:".to_string());
    if numbers.is_empty() {
        lines.push("- (no open PRs)".to_string());
    }
    for number in numbers {
        let old = before.get(&number).map(|sha| short_sha(sha)).unwrap_or("-");
        let new = after.get(&number).map(|sha| short_sha(sha)).unwrap_or("-");
        lines.push(format!("- #{} {}/{}", number, old, new));
    }

    lines.push(format!("consecutiveNoUpdateSkips: {}", consecutive_skips));
    lines.push(format!("nextActionAt: {}", format_optional_timestamp(current.next_action_at)));
    lines.join("\n")
}
