//! Change detection, polling cadence and notification decisions.

pub mod change_detection;
pub mod notification;
pub mod polling;

pub use change_detection::{ChangeDetector, ChangeReport, ChangeSource};
pub use notification::{CommentKind, CommentPlan, NotificationPolicy, SkipDecision};
pub use polling::{PollingDecision, PollingMode, PollingScheduler};
