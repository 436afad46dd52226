//! Task model - the schedulable unit of construction work.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use crate::id::{ProjectId, TaskId};
use crate::Time;

/// A task is a unit of site work with a date range and optional prerequisites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: TaskId,

    /// Owning project
    pub project_id: ProjectId,

    /// Task title
    pub title: String,

    /// Detailed description
    #[serde(default)]
    pub description: String,

    /// Trade category ("Concrete", "Steel", ...), used as the QA rule key
    pub category: String,

    /// Current status
    pub status: TaskStatus,

    /// Priority
    pub priority: Priority,

    /// First working day (inclusive)
    pub start_date: NaiveDate,

    /// Last working day (inclusive)
    pub end_date: NaiveDate,

    /// Planned duration in days, as entered by the planner
    pub planned_duration_days: u32,

    /// Percentage complete (0-100)
    pub progress_percentage: u8,

    /// Tasks that must complete before this one may start
    #[serde(default)]
    pub dependencies: Vec<TaskId>,

    /// Person responsible; QA alerts raised for this task are assigned here
    #[serde(default)]
    pub assignee: Option<String>,

    /// Display color
    #[serde(default)]
    pub color: Option<String>,

    /// Creation timestamp
    pub created_at: Time,

    /// Last update timestamp
    pub updated_at: Time,
}

impl Task {
    /// Create a pending, medium-priority task spanning `start_date..=end_date`.
    pub fn new(
        project_id: ProjectId,
        title: impl Into<String>,
        category: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        let now = chrono::Utc::now();
        let span = (end_date - start_date).num_days() + 1;
        Self {
            id: TaskId::new(),
            project_id,
            title: title.into(),
            description: String::new(),
            category: category.into(),
            status: TaskStatus::Pending,
            priority: Priority::Medium,
            start_date,
            end_date,
            planned_duration_days: span.max(0) as u32,
            progress_percentage: 0,
            dependencies: Vec::new(),
            assignee: None,
            color: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set dependencies.
    pub fn with_dependencies(mut self, deps: impl IntoIterator<Item = TaskId>) -> Self {
        self.dependencies = deps.into_iter().collect();
        self
    }

    /// Set status.
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    /// Set priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Set progress percentage.
    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress_percentage = progress;
        self
    }

    /// Set assignee.
    pub fn with_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }

    /// Number of days between start and end (zero for a single-day task).
    pub fn span_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }

    /// Whether this task lists `id` as a prerequisite.
    pub fn depends_on(&self, id: TaskId) -> bool {
        self.dependencies.contains(&id)
    }

    /// Capture the rule-relevant fields before a mutation.
    pub fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            status: self.status,
            progress_percentage: self.progress_percentage,
            start_date: self.start_date,
            category: self.category.clone(),
        }
    }
}

/// Rule-relevant state of a task at a previous point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub status: TaskStatus,
    pub progress_percentage: u8,
    pub start_date: NaiveDate,
    pub category: String,
}

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not started
    Pending,
    /// Work under way
    InProgress,
    /// Finished
    Completed,
    /// Running late
    Delayed,
    /// Will not be done
    Cancelled,
}

impl TaskStatus {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Delayed => "delayed",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = crate::ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" | "done" => Ok(Self::Completed),
            "delayed" => Ok(Self::Delayed),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(crate::ParseEnumError::new("task status", s)),
        }
    }
}

/// Priority shared by tasks, rules and alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }

    /// Marker prepended to notification titles for urgent priorities.
    pub fn urgency_marker(&self) -> Option<&'static str> {
        match self {
            Priority::Critical => Some("[CRITICAL] "),
            Priority::High => Some("[URGENT] "),
            Priority::Medium | Priority::Low => None,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = crate::ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(crate::ParseEnumError::new("priority", s)),
        }
    }
}

/// Partial update for a task. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub planned_duration_days: Option<u32>,
    pub progress_percentage: Option<u8>,
    pub dependencies: Option<Vec<TaskId>>,
    pub assignee: Option<Option<String>>,
    pub color: Option<Option<String>>,
}

impl TaskPatch {
    /// Whether the patch replaces the dependency set.
    pub fn touches_dependencies(&self) -> bool {
        self.dependencies.is_some()
    }

    /// Apply the patch onto a task, bumping `updated_at`.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(category) = &self.category {
            task.category = category.clone();
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(start) = self.start_date {
            task.start_date = start;
        }
        if let Some(end) = self.end_date {
            task.end_date = end;
        }
        if let Some(days) = self.planned_duration_days {
            task.planned_duration_days = days;
        }
        if let Some(progress) = self.progress_percentage {
            task.progress_percentage = progress;
        }
        if let Some(deps) = &self.dependencies {
            task.dependencies = deps.clone();
        }
        if let Some(assignee) = &self.assignee {
            task.assignee = assignee.clone();
        }
        if let Some(color) = &self.color {
            task.color = color.clone();
        }
        task.updated_at = chrono::Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    #[test]
    fn test_new_task_defaults() {
        let task = Task::new(ProjectId::new(), "Pour slab", "Concrete", day(1), day(5));
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.planned_duration_days, 5);
        assert_eq!(task.span_days(), 4);
        assert!(task.dependencies.is_empty());
    }

    #[test]
    fn test_status_parsing_accepts_common_spellings() {
        assert_eq!("in-progress".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert_eq!("In_Progress".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert_eq!("canceled".parse::<TaskStatus>().unwrap(), TaskStatus::Cancelled);
        assert!("paused".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }

    #[test]
    fn test_urgency_marker() {
        assert_eq!(Priority::Critical.urgency_marker(), Some("[CRITICAL] "));
        assert_eq!(Priority::High.urgency_marker(), Some("[URGENT] "));
        assert_eq!(Priority::Medium.urgency_marker(), None);
        assert_eq!(Priority::Low.urgency_marker(), None);
    }

    #[test]
    fn test_patch_only_touches_given_fields() {
        let mut task = Task::new(ProjectId::new(), "Erect frame", "Steel", day(1), day(3))
            .with_assignee("sam");
        let patch = TaskPatch {
            status: Some(TaskStatus::InProgress),
            progress_percentage: Some(40),
            ..Default::default()
        };
        patch.apply_to(&mut task);

        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.progress_percentage, 40);
        assert_eq!(task.title, "Erect frame");
        assert_eq!(task.assignee.as_deref(), Some("sam"));
        assert!(!patch.touches_dependencies());
    }

    #[test]
    fn test_patch_can_clear_assignee() {
        let mut task = Task::new(ProjectId::new(), "Erect frame", "Steel", day(1), day(3))
            .with_assignee("sam");
        let patch = TaskPatch {
            assignee: Some(None),
            ..Default::default()
        };
        patch.apply_to(&mut task);
        assert!(task.assignee.is_none());
    }
}
