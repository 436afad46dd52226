//! Errors raised by the schedule layer.

use sitegate_core::{Date, TaskId};

/// Result type for schedule operations.
pub type Result<T> = std::result::Result<T, ScheduleError>;

/// Errors that can occur while mutating or rescheduling the task graph.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    /// Malformed task fields or duplicate ids
    #[error("validation error: {0}")]
    Validation(String),

    /// Referenced task does not exist
    #[error("unknown task: {0}")]
    UnknownTask(TaskId),

    /// Dependency graph would contain a cycle
    #[error("dependency cycle detected through {} task(s)", .0.len())]
    CycleDetected(Vec<TaskId>),

    /// Task is still listed as a prerequisite
    #[error("task {task} is still a dependency of {} task(s)", .dependents.len())]
    ReferentialIntegrity {
        /// Task being removed
        task: TaskId,
        /// Tasks that depend on it
        dependents: Vec<TaskId>,
    },

    /// A move would start a task before its prerequisites finish
    #[error("task {task} cannot start on {requested_start}; earliest allowed start is {earliest_start}")]
    ConstraintViolation {
        /// Offending task
        task: TaskId,
        /// First day after all prerequisites end
        earliest_start: Date,
        /// Start date the move asked for
        requested_start: Date,
    },
}
