//! Work layer errors.

use sitegate_quality::QualityError;
use sitegate_schedule::ScheduleError;
use sitegate_storage::StorageError;

/// Result type for coordinator operations.
pub type Result<T> = std::result::Result<T, WorkError>;

/// Errors surfaced by the coordinator.
#[derive(Debug, thiserror::Error)]
pub enum WorkError {
    /// Graph or reschedule rejection
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    /// Alert or checklist rejection
    #[error(transparent)]
    Quality(#[from] QualityError),

    /// Storage failure
    #[error(transparent)]
    Storage(#[from] StorageError),
}
