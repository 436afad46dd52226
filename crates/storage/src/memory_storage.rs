//! In-memory storage backend.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use sitegate_core::{AlertId, ProjectId, QaAlert, Task, TaskId};

use crate::trait_::{check_project, check_unique, AlertStore, Result, TaskStore};

/// Storage held entirely in memory. Used by tests and one-shot runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    tasks: HashMap<ProjectId, BTreeMap<TaskId, Task>>,
    alerts: BTreeMap<AlertId, QaAlert>,
}

impl MemoryStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored alerts across all projects.
    pub fn alert_count(&self) -> usize {
        self.alerts.len()
    }
}

#[async_trait]
impl TaskStore for MemoryStorage {
    async fn load_tasks(&self, project: ProjectId) -> Result<Vec<Task>> {
        Ok(self
            .tasks
            .get(&project)
            .map(|tasks| tasks.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn save_task_updates(&mut self, project: ProjectId, tasks: &[Task]) -> Result<()> {
        check_project(project, tasks)?;
        let stored = self.tasks.entry(project).or_default();
        for task in tasks {
            stored.insert(task.id, task.clone());
        }
        Ok(())
    }

    async fn delete_task(&mut self, project: ProjectId, id: TaskId) -> Result<()> {
        if let Some(tasks) = self.tasks.get_mut(&project) {
            tasks.remove(&id);
        }
        Ok(())
    }
}

#[async_trait]
impl AlertStore for MemoryStorage {
    async fn upsert_alert(&mut self, alert: &QaAlert) -> Result<()> {
        let live = self.list_live_alerts(alert.project_id).await?;
        check_unique(alert, &live)?;
        self.alerts.insert(alert.id, alert.clone());
        Ok(())
    }

    async fn load_alert(&self, id: AlertId) -> Result<Option<QaAlert>> {
        Ok(self.alerts.get(&id).cloned())
    }

    async fn list_live_alerts(&self, project: ProjectId) -> Result<Vec<QaAlert>> {
        let mut alerts: Vec<QaAlert> = self
            .alerts
            .values()
            .filter(|a| a.project_id == project)
            .cloned()
            .collect();
        alerts.sort_by_key(|a| (a.created_at, a.id));
        Ok(alerts)
    }

    async fn delete_alert(&mut self, id: AlertId) -> Result<()> {
        self.alerts.remove(&id);
        Ok(())
    }
}
