//! Storage trait abstraction.

use async_trait::async_trait;
use sitegate_core::{AlertId, ChecklistItemId, ProjectId, QaAlert, Task, TaskId};
use sitegate_quality::{ChecklistMachine, CompletionOutcome, QaRuleEngine, QualityError};

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Alert write or checklist update rejected
    #[error(transparent)]
    Quality(#[from] QualityError),

    /// Item not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Task data access.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Load every task of a project. A record that cannot be read is an error.
    async fn load_tasks(&self, project: ProjectId) -> Result<Vec<Task>>;

    /// Write a batch of created or updated tasks.
    async fn save_task_updates(&mut self, project: ProjectId, tasks: &[Task]) -> Result<()>;

    /// Delete a task. Deleting a missing task is not an error.
    async fn delete_task(&mut self, project: ProjectId, id: TaskId) -> Result<()>;
}

/// QA alert persistence.
#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Create or replace an alert.
    ///
    /// Rejects with `DuplicateAlert` when another alert already covers the
    /// same task and rule.
    async fn upsert_alert(&mut self, alert: &QaAlert) -> Result<()>;

    /// Load an alert by id.
    async fn load_alert(&self, id: AlertId) -> Result<Option<QaAlert>>;

    /// Every stored alert of a project, oldest first.
    ///
    /// Fails rather than returning a partial list, since deduplication relies
    /// on seeing every live alert.
    async fn list_live_alerts(&self, project: ProjectId) -> Result<Vec<QaAlert>>;

    /// Delete an alert. Deleting a missing alert is not an error.
    async fn delete_alert(&mut self, id: AlertId) -> Result<()>;

    /// Complete a checklist item and store the result.
    ///
    /// Unknown alerts are `NotFound`; unknown items surface as `Quality`.
    async fn record_checklist_completion(
        &mut self,
        alert_id: AlertId,
        item_id: ChecklistItemId,
        completed_by: &str,
        notes: Option<String>,
    ) -> Result<(QaAlert, CompletionOutcome)> {
        let mut alert = self
            .load_alert(alert_id)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("alert {alert_id}")))?;

        let outcome = ChecklistMachine::complete_item(&mut alert, item_id, completed_by, notes)?;
        if outcome != CompletionOutcome::AlreadyCompleted {
            self.upsert_alert(&alert).await?;
        }
        Ok((alert, outcome))
    }
}

pub(crate) fn check_project(project: ProjectId, tasks: &[Task]) -> Result<()> {
    match tasks.iter().find(|t| t.project_id != project) {
        Some(task) => Err(StorageError::Other(format!(
            "task {} belongs to project {}, not {}",
            task.id, task.project_id, project
        ))),
        None => Ok(()),
    }
}

pub(crate) fn check_unique(alert: &QaAlert, live: &[QaAlert]) -> Result<()> {
    QaRuleEngine::ensure_unique(alert, live)?;
    Ok(())
}
