//! Quality model - QA alerts, checklists, and notifications.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use crate::id::{AlertId, ChecklistItemId, NotificationId, ProjectId, TaskId};
use crate::task::Priority;
use crate::Time;

/// How a QA rule is triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Fires when a task's start date is close
    ScheduleProximity,
    /// Fires when a task enters one of a set of statuses
    StatusTransition,
}

impl RuleKind {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::ScheduleProximity => "schedule_proximity",
            RuleKind::StatusTransition => "status_transition",
        }
    }
}

/// A generated inspection obligation tied to a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaAlert {
    /// Unique identifier
    pub id: AlertId,

    /// Owning project
    pub project_id: ProjectId,

    /// Governing task
    pub task_id: TaskId,

    /// Stable key of the rule that raised this alert
    pub rule_type: String,

    /// Trigger kind of that rule
    pub rule_kind: RuleKind,

    /// Current status
    pub status: AlertStatus,

    /// Alert title
    pub title: String,

    /// Description
    pub description: String,

    /// When the inspection is due
    pub due_date: NaiveDate,

    /// Priority
    pub priority: Priority,

    /// Person the alert is assigned to
    pub assigned_to: Option<String>,

    /// Ordered checklist
    pub checklist: Vec<ChecklistItem>,

    /// Who completed the alert
    pub completed_by: Option<String>,

    /// When the alert was completed
    pub completed_at: Option<Time>,

    /// Whether a notification has been published for this alert
    #[serde(default)]
    pub notified: bool,

    /// Creation timestamp
    pub created_at: Time,

    /// Last update timestamp
    pub updated_at: Time,
}

impl QaAlert {
    /// Look up a checklist item.
    pub fn item(&self, id: ChecklistItemId) -> Option<&ChecklistItem> {
        self.checklist.iter().find(|i| i.id == id)
    }

    /// Whether every required checklist item is completed.
    ///
    /// An alert with no required items is never considered done by the
    /// checklist; it can only be closed through a manual status change.
    pub fn all_required_done(&self) -> bool {
        let mut required = self.checklist.iter().filter(|i| i.required).peekable();
        required.peek().is_some() && required.all(|i| i.completed)
    }

    /// Number of completed items over total items.
    pub fn completion_ratio(&self) -> (usize, usize) {
        let done = self.checklist.iter().filter(|i| i.completed).count();
        (done, self.checklist.len())
    }

    /// Whether this alert was raised for the given task and rule.
    pub fn matches(&self, task_id: TaskId, rule_type: &str) -> bool {
        self.task_id == task_id && self.rule_type == rule_type
    }
}

/// Alert lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Pending,
    InProgress,
    Completed,
}

impl AlertStatus {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Pending => "pending",
            AlertStatus::InProgress => "in_progress",
            AlertStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for AlertStatus {
    type Err = crate::ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" | "done" => Ok(Self::Completed),
            _ => Err(crate::ParseEnumError::new("alert status", s)),
        }
    }
}

/// One step of an alert's checklist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: ChecklistItemId,
    pub text: String,
    pub required: bool,
    pub completed: bool,
    pub completed_by: Option<String>,
    pub completed_at: Option<Time>,
    pub notes: Option<String>,
}

impl ChecklistItem {
    /// Create an open checklist item.
    pub fn new(text: impl Into<String>, required: bool) -> Self {
        Self {
            id: ChecklistItemId::new(),
            text: text.into(),
            required,
            completed: false,
            completed_by: None,
            completed_at: None,
            notes: None,
        }
    }
}

/// Message handed to the notification sink when an alert is raised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub project_id: ProjectId,
    pub alert_id: AlertId,
    pub task_id: TaskId,
    pub recipient: String,
    pub title: String,
    pub message: String,
    pub priority: Priority,
    pub created_at: Time,
}

impl Notification {
    /// Build the notification for a freshly raised alert.
    ///
    /// Returns `None` when the alert has no (non-blank) assignee.
    pub fn for_alert(alert: &QaAlert) -> Option<Self> {
        let recipient = alert
            .assigned_to
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())?;

        let marker = alert.priority.urgency_marker().unwrap_or("");
        Some(Self {
            id: NotificationId::new(),
            project_id: alert.project_id,
            alert_id: alert.id,
            task_id: alert.task_id,
            recipient: recipient.to_string(),
            title: format!("{}{}", marker, alert.title),
            message: format!("{} (due {})", alert.description, alert.due_date),
            priority: alert.priority,
            created_at: chrono::Utc::now(),
        })
    }
}
