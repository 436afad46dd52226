//! Project coordination (Layer 2)
//!
//! Wires the schedule and quality engines to storage and notification
//! delivery: one coordinator per project, one writer at a time.

#![warn(missing_docs)]

pub mod clock;
pub mod coordinator;
pub mod error;

pub use clock::{Clock, SystemClock, FixedClock};
pub use coordinator::{ProjectCoordinator, Outcome, TimelineRequest};
pub use error::{WorkError, Result};
