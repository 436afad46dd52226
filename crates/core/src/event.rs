//! Mutation events - what the QA engine observes.

use serde::{Deserialize, Serialize};
use crate::task::{Task, TaskSnapshot};

/// A task after a mutation, together with its state before it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskMutationEvent {
    /// The task as it is now
    pub task: Task,

    /// Rule-relevant state before the mutation; `None` on first observation
    pub previous: Option<TaskSnapshot>,
}

impl TaskMutationEvent {
    /// Event for a task seen for the first time.
    pub fn created(task: Task) -> Self {
        Self { task, previous: None }
    }

    /// Event for a task that changed from `previous`.
    pub fn updated(task: Task, previous: TaskSnapshot) -> Self {
        Self {
            task,
            previous: Some(previous),
        }
    }

    /// Event re-observing a task whose state did not change (periodic scans).
    pub fn observed(task: Task) -> Self {
        let previous = task.snapshot();
        Self::updated(task, previous)
    }

    /// Whether the task's status differs from the previous observation.
    pub fn status_changed(&self) -> bool {
        match &self.previous {
            Some(prev) => prev.status != self.task.status,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ProjectId, TaskStatus};
    use chrono::NaiveDate;

    fn task() -> Task {
        let d = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        Task::new(ProjectId::new(), "Pour slab", "Concrete", d, d)
    }

    #[test]
    fn test_first_observation_counts_as_change() {
        assert!(TaskMutationEvent::created(task()).status_changed());
    }

    #[test]
    fn test_observed_is_not_a_change() {
        assert!(!TaskMutationEvent::observed(task()).status_changed());
    }

    #[test]
    fn test_updated_detects_transition() {
        let before = task();
        let prev = before.snapshot();
        let after = before.with_status(TaskStatus::InProgress);
        assert!(TaskMutationEvent::updated(after, prev).status_changed());
    }
}
