//! Errors raised by the quality layer.

use sitegate_core::{AlertId, ChecklistItemId, TaskId};

/// Result type for quality operations.
pub type Result<T> = std::result::Result<T, QualityError>;

/// Errors that can occur while raising or working through QA alerts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QualityError {
    /// A live alert already exists for this task and rule
    #[error("alert for rule '{rule_type}' already exists on task {task}")]
    DuplicateAlert {
        /// Governing task
        task: TaskId,
        /// Rule key
        rule_type: String,
    },

    /// Checklist item is not part of the alert
    #[error("checklist item {item} is not part of alert {alert}")]
    UnknownChecklistItem {
        /// Alert searched
        alert: AlertId,
        /// Missing item
        item: ChecklistItemId,
    },

    /// Alert does not exist
    #[error("unknown alert: {0}")]
    UnknownAlert(AlertId),
}
