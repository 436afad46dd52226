//! Schedule layer - task graph, timeline layout, and rescheduling.

#![warn(missing_docs)]

pub mod error;
pub mod graph;
pub mod layout;
pub mod reschedule;

pub use error::{ScheduleError, Result};
pub use graph::{TaskGraph, DependencyEdge, RemovalMode, Removal};
pub use layout::{layout, layout_with, TimelineWindow, TimelineLayout, TaskRect, DependencyArrow, Point};
pub use reschedule::{RescheduleResolver, MoveProposal, ScheduleUpdate};
