//! sitegate core data models.
//!
//! This crate defines the data structures shared by the schedule and
//! quality-gate engines: tasks, mutation events, QA alerts and their
//! checklists, notifications, and configuration.

#![warn(missing_docs)]

// Core identities
mod id;

// Scheduling
mod task;
mod event;

// Quality gates
mod quality;

mod config;

// Re-exports
pub use id::*;

pub use task::{Task, TaskStatus, Priority, TaskPatch, TaskSnapshot};
pub use event::TaskMutationEvent;
pub use quality::{
    QaAlert, AlertStatus, RuleKind, ChecklistItem, Notification,
};
pub use config::{SitegateConfig, TimelineConfig, ZoomRange, QualityConfig};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;

/// Calendar day type used for schedule dates
pub type Date = chrono::NaiveDate;

/// Error returned when parsing a status or priority from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {value:?}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl ParseEnumError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Signed number of calendar days from `from` to `to`.
pub fn days_between(from: Date, to: Date) -> i64 {
    (to - from).num_days()
}

/// Shift a calendar date by a signed number of days; `None` past the calendar's range.
pub fn shift_days(date: Date, days: i64) -> Option<Date> {
    if days >= 0 {
        date.checked_add_days(chrono::Days::new(days as u64))
    } else {
        date.checked_sub_days(chrono::Days::new(days.unsigned_abs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_arithmetic() {
        let d = Date::from_ymd_opt(2025, 2, 27).unwrap();
        assert_eq!(shift_days(d, 2), Date::from_ymd_opt(2025, 3, 1));
        assert_eq!(shift_days(d, -27), Date::from_ymd_opt(2025, 1, 31));
        assert_eq!(days_between(d, Date::from_ymd_opt(2025, 3, 1).unwrap()), 2);
        assert_eq!(shift_days(Date::MAX, 1), None);
    }
}
