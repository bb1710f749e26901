use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::classification::types::short_sha;
use crate::state::snapshot::{count_keys, Snapshot};

/// Axis along which a scan differs from the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeSource {
    Sha,
    ReviewDecision,
    Ci,
}

impl ChangeSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha => "sha",
            Self::ReviewDecision => "reviewDecision",
            Self::Ci => "ci",
        }
    }
}

impl fmt::Display for ChangeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate counts whose movement counts as a `ci` change.
pub const CI_COUNT_KEYS: &[&str] = &[
    count_keys::OPEN,
    count_keys::NBS_UNBOUND,
    count_keys::CHANGE_REQUESTS,
    count_keys::STALE_OPEN_PRS,
    count_keys::STALE_OPEN_PRS_DIGEST,
    count_keys::OWNER_PING_CANDIDATES,
    count_keys::NEW_PRS,
    count_keys::APPROVED_UNMERGED_PRS,
    count_keys::STABLE_TERMINAL_PRS,
];

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChangeReport {
    pub changed: bool,
    pub sources: BTreeSet<ChangeSource>,
    pub details: Vec<String>,
}

impl ChangeReport {
    /// `sha,reviewDecision`-style label, `none` when nothing changed.
    pub fn source_label(&self) -> String {
        if self.sources.is_empty() {
            return "none".to_string();
        }
        self.sources
            .iter()
            .map(ChangeSource::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

pub struct ChangeDetector;

impl ChangeDetector {
    pub fn detect(current: &Snapshot, previous: Option<&Snapshot>) -> ChangeReport {
        let Some(previous) = previous else {
            return ChangeReport {
                changed: true,
                sources: BTreeSet::from([ChangeSource::Ci]),
                details: vec!["first scan: no previous run".to_string()],
            };
        };

        let mut report = ChangeReport::default();

        let sha_details = diff_maps("headSha", &previous.head_shas(), &current.head_shas(), |sha| {
            short_sha(sha).to_string()
        });
        if !sha_details.is_empty() {
            report.sources.insert(ChangeSource::Sha);
            report.details.extend(sha_details);
        }

        let review_details = diff_maps(
            "reviewDecision",
            &previous.review_decisions(),
            &current.review_decisions(),
            |decision| decision.to_string(),
        );
        if !review_details.is_empty() {
            report.sources.insert(ChangeSource::ReviewDecision);
            report.details.extend(review_details);
        }

        let mut ci_changed = false;
        for key in CI_COUNT_KEYS {
            let before = previous.counts.get(key);
            let after = current.counts.get(key);
            if before != after {
                ci_changed = true;
                report.details.push(format!("{} {} -> {}", key, before, after));
            }
        }
        if ci_changed {
            report.sources.insert(ChangeSource::Ci);
        }

        report.changed = !report.sources.is_empty();
        report
    }

    /// Copy the detection result onto the snapshot.
    pub fn apply(snapshot: &mut Snapshot, report: &ChangeReport) {
        snapshot.changed = report.changed;
        snapshot.change_detection_source = report.source_label();
        snapshot.change_detection_sources = report.sources.clone();
        snapshot.change_details = report.details.clone();
    }
}

fn diff_maps<V: PartialEq>(
    field: &str,
    before: &BTreeMap<u64, V>,
    after: &BTreeMap<u64, V>,
    show: impl Fn(&V) -> String,
) -> Vec<String> {
    let numbers: BTreeSet<u64> = before.keys().chain(after.keys()).copied().collect();
    numbers
        .into_iter()
        .filter_map(|number| match (before.get(&number), after.get(&number)) {
            (Some(old), Some(new)) if old == new => None,
            (Some(old), Some(new)) => Some(format!("#{} {} {} -> {}", number, field, show(old), show(new))),
            (None, Some(new)) => Some(format!("#{} {} (new) -> {}", number, field, show(new))),
            (Some(old), None) => Some(format!("#{} {} {} -> (gone)", number, field, show(old))),
            (None, None) => None,
        })
        .collect()
}
