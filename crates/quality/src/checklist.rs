//! Checklist state machine - records item completions and closes alerts.
//!
//! ```text
//! pending -> in_progress -> completed
//! ```
//! The only automatic transition is to `completed`, taken when every
//! required item is done. Any other change is a manual override.

use sitegate_core::{AlertStatus, ChecklistItemId, QaAlert};
use tracing::info;

use crate::error::{QualityError, Result};

/// What a completion call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// Item recorded; alert still open
    Recorded,
    /// Item recorded and it closed the alert
    AlertCompleted,
    /// Item was already complete; nothing changed
    AlreadyCompleted,
}

/// Drives checklist completion on an alert.
pub struct ChecklistMachine;

impl ChecklistMachine {
    /// Mark a checklist item complete.
    ///
    /// Re-completing an item is a no-op that keeps the original completer
    /// and timestamp. Unknown items are reported.
    pub fn complete_item(
        alert: &mut QaAlert,
        item_id: ChecklistItemId,
        completed_by: &str,
        notes: Option<String>,
    ) -> Result<CompletionOutcome> {
        let alert_id = alert.id;
        let item = alert
            .checklist
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or(QualityError::UnknownChecklistItem { alert: alert_id, item: item_id })?;

        if item.completed {
            return Ok(CompletionOutcome::AlreadyCompleted);
        }

        let now = chrono::Utc::now();
        item.completed = true;
        item.completed_by = Some(completed_by.to_string());
        item.completed_at = Some(now);
        if notes.is_some() {
            item.notes = notes;
        }
        alert.updated_at = now;

        if alert.status != AlertStatus::Completed && alert.all_required_done() {
            alert.status = AlertStatus::Completed;
            alert.completed_by = Some(completed_by.to_string());
            alert.completed_at = Some(now);
            info!(alert = %alert.id, by = completed_by, "All required checklist items done, alert completed");
            return Ok(CompletionOutcome::AlertCompleted);
        }

        Ok(CompletionOutcome::Recorded)
    }

    /// Manually set an alert's status, bypassing the checklist.
    ///
    /// Moving to `completed` stamps the completer and time; moving anywhere
    /// else clears them.
    pub fn set_status(alert: &mut QaAlert, status: AlertStatus, completed_by: Option<String>) {
        let now = chrono::Utc::now();
        if status == AlertStatus::Completed {
            if alert.status != AlertStatus::Completed || completed_by.is_some() {
                alert.completed_by = completed_by.or_else(|| alert.completed_by.take());
                alert.completed_at = Some(now);
            }
        } else {
            alert.completed_by = None;
            alert.completed_at = None;
        }
        info!(alert = %alert.id, from = %alert.status, to = %status, "Alert status overridden");
        alert.status = status;
        alert.updated_at = now;
    }
}
