//! JSON file storage implementation.
//!
//! Layout under the storage root:
//!
//! ```text
//! projects/<project>/tasks/<task>.json
//! alerts/<alert>.json
//! ```
//! Each record is written to a temporary file and renamed into place, so a
//! crash mid-write leaves the previous version intact. A batch of tasks is
//! staged completely before any rename; a failure while staging leaves every
//! task untouched. A failure during the renames themselves can still leave a
//! batch partly applied.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use sitegate_core::{AlertId, ProjectId, QaAlert, Task, TaskId};
use tokio::fs;
use tracing::debug;

use crate::trait_::{check_project, check_unique, AlertStore, Result, TaskStore};

/// File-based JSON storage backend.
pub struct JsonStorage {
    root: PathBuf,
}

impl JsonStorage {
    /// Open storage rooted at `root`, creating directories as needed.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join("projects")).await?;
        fs::create_dir_all(root.join("alerts")).await?;
        Ok(Self { root })
    }

    /// Storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn tasks_dir(&self, project: ProjectId) -> PathBuf {
        self.root.join("projects").join(project.to_string()).join("tasks")
    }

    fn task_path(&self, project: ProjectId, id: TaskId) -> PathBuf {
        self.tasks_dir(project).join(format!("{id}.json"))
    }

    fn alert_path(&self, id: AlertId) -> PathBuf {
        self.root.join("alerts").join(format!("{id}.json"))
    }
}

#[async_trait]
impl TaskStore for JsonStorage {
    async fn load_tasks(&self, project: ProjectId) -> Result<Vec<Task>> {
        list_dir(&self.tasks_dir(project)).await
    }

    async fn save_task_updates(&mut self, project: ProjectId, tasks: &[Task]) -> Result<()> {
        check_project(project, tasks)?;
        fs::create_dir_all(self.tasks_dir(project)).await?;

        let mut staged = Vec::with_capacity(tasks.len());
        for task in tasks {
            let path = self.task_path(project, task.id);
            match stage_json(&path, task).await {
                Ok(tmp) => staged.push((tmp, path)),
                Err(e) => {
                    for (tmp, _) in &staged {
                        let _ = fs::remove_file(tmp).await;
                    }
                    return Err(e);
                }
            }
        }
        for (tmp, path) in &staged {
            fs::rename(tmp, path).await?;
        }

        debug!(project = %project, count = tasks.len(), "Saved tasks");
        Ok(())
    }

    async fn delete_task(&mut self, project: ProjectId, id: TaskId) -> Result<()> {
        remove_file(&self.task_path(project, id)).await
    }
}

#[async_trait]
impl AlertStore for JsonStorage {
    async fn upsert_alert(&mut self, alert: &QaAlert) -> Result<()> {
        let live = self.list_live_alerts(alert.project_id).await?;
        check_unique(alert, &live)?;
        write_json(&self.alert_path(alert.id), alert).await
    }

    async fn load_alert(&self, id: AlertId) -> Result<Option<QaAlert>> {
        read_json(&self.alert_path(id)).await
    }

    async fn list_live_alerts(&self, project: ProjectId) -> Result<Vec<QaAlert>> {
        let mut alerts: Vec<QaAlert> = list_dir(&self.root.join("alerts"))
            .await?
            .into_iter()
            .filter(|a: &QaAlert| a.project_id == project)
            .collect();
        alerts.sort_by_key(|a| (a.created_at, a.id));
        Ok(alerts)
    }

    async fn delete_alert(&mut self, id: AlertId) -> Result<()> {
        remove_file(&self.alert_path(id)).await
    }
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let tmp = stage_json(path, value).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

/// Write `value` next to `path` and return the temporary file.
async fn stage_json<T: Serialize>(path: &Path, value: &T) -> Result<PathBuf> {
    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json.as_bytes()).await?;
    Ok(tmp)
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read_to_string(path).await {
        Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn list_dir<T: DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    let mut items = Vec::new();
    let mut rd = match fs::read_dir(dir).await {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(items),
        Err(e) => return Err(e.into()),
    };
    while let Some(entry) = rd.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        if let Some(item) = read_json(&path).await? {
            items.push(item);
        }
    }
    Ok(items)
}

async fn remove_file(path: &Path) -> Result<()> {
    fs::remove_file(path).await.or_else(|e| {
        if e.kind() == std::io::ErrorKind::NotFound { Ok(()) } else { Err(e) }
    })?;
    Ok(())
}
