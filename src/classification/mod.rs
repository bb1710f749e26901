//! Entity normalization, runtime state tracking and classification.

pub mod engine;
pub mod normalize;
pub mod runtime;
pub mod types;

pub use engine::{ClassificationEngine, ClassificationInput};
pub use normalize::{EntityNormalizer, PrStateCache};
pub use runtime::{PrRuntimeEntry, PrRuntimeMap, RuntimeStateTracker, RuntimeUpdate};
pub use types::{IssueRef, LinkedIssue, PrRef, TrackedPullRequest};
