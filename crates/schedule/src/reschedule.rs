//! Reschedule resolver - turns a drag gesture into a consistent set of date changes.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use sitegate_core::{shift_days, Date, TaskId};
use tracing::debug;

use crate::error::{Result, ScheduleError};
use crate::graph::TaskGraph;

/// New date range for one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleUpdate {
    /// New start date
    pub start_date: Date,
    /// New end date
    pub end_date: Date,
}

/// Full set of date changes produced by a move, to be applied atomically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveProposal {
    /// Dragged task
    pub task_id: Option<TaskId>,
    /// Requested shift in days
    pub day_delta: i64,
    /// Per-task new ranges, including the dragged task
    pub updates: BTreeMap<TaskId, ScheduleUpdate>,
}

impl MoveProposal {
    /// Whether nothing changes.
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    /// Tasks other than the dragged one that were pushed forward.
    pub fn cascaded(&self) -> impl Iterator<Item = (&TaskId, &ScheduleUpdate)> + '_ {
        self.updates.iter().filter(move |(id, _)| Some(**id) != self.task_id)
    }
}

/// Computes reschedules against a snapshot of the task graph.
///
/// The resolver never mutates the graph; callers apply the returned proposal
/// with [`TaskGraph::apply_updates`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RescheduleResolver;

impl RescheduleResolver {
    /// Create a new resolver.
    pub fn new() -> Self {
        Self
    }

    /// Propose shifting `task_id` by `day_delta` calendar days.
    ///
    /// The dragged task keeps its duration. Every transitive dependent that
    /// would then start on or before the latest end of its prerequisites is
    /// pushed forward by exactly the overlap, keeping its own duration.
    /// Dependents are never pulled backward.
    ///
    /// Fails with `ConstraintViolation` when the dragged task itself would
    /// start before one of its own prerequisites finishes.
    pub fn propose_move(&self, graph: &TaskGraph, task_id: TaskId, day_delta: i64) -> Result<MoveProposal> {
        if day_delta == 0 {
            return Ok(MoveProposal::default());
        }

        let task = graph.get(task_id).ok_or(ScheduleError::UnknownTask(task_id))?;
        let new_start = shift(task.start_date, day_delta, task_id)?;
        let new_end = shift(task.end_date, day_delta, task_id)?;

        if let Some(earliest) = graph.earliest_start(task_id) {
            if new_start < earliest {
                return Err(ScheduleError::ConstraintViolation {
                    task: task_id,
                    earliest_start: earliest,
                    requested_start: new_start,
                });
            }
        }

        let mut proposed: HashMap<TaskId, ScheduleUpdate> = HashMap::new();
        proposed.insert(task_id, ScheduleUpdate { start_date: new_start, end_date: new_end });

        let downstream = graph.descendants_of(task_id);
        if !downstream.is_empty() {
            for id in graph.topological_order()? {
                if !downstream.contains(&id) {
                    continue;
                }
                let Some(dependent) = graph.get(id) else { continue };

                let latest_end = dependent
                    .dependencies
                    .iter()
                    .filter_map(|d| {
                        proposed
                            .get(d)
                            .map(|u| u.end_date)
                            .or_else(|| graph.get(*d).map(|t| t.end_date))
                    })
                    .max();

                let Some(latest_end) = latest_end else { continue };
                if dependent.start_date > latest_end {
                    continue;
                }

                let overlap = (latest_end - dependent.start_date).num_days() + 1;
                let update = ScheduleUpdate {
                    start_date: shift(dependent.start_date, overlap, id)?,
                    end_date: shift(dependent.end_date, overlap, id)?,
                };
                debug!(task = %id, days = overlap, "Cascading dependent forward");
                proposed.insert(id, update);
            }
        }

        Ok(MoveProposal {
            task_id: Some(task_id),
            day_delta,
            updates: proposed.into_iter().collect(),
        })
    }
}

fn shift(date: Date, days: i64, task: TaskId) -> Result<Date> {
    shift_days(date, days)
        .ok_or_else(|| ScheduleError::Validation(format!("moving task {} by {} days leaves the calendar", task, days)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitegate_core::{ProjectId, Task};

    fn day(d: i64) -> Date {
        shift_days(Date::from_ymd_opt(2025, 1, 1).unwrap(), d).unwrap()
    }

    fn task(title: &str, start: i64, end: i64) -> Task {
        Task::new(ProjectId::new(), title, "General", day(start), day(end))
    }

    #[test]
    fn test_zero_delta_is_noop() {
        let mut graph = TaskGraph::new();
        let a = task("A", 0, 5);
        let id = a.id;
        graph.add_task(a).unwrap();
        assert!(RescheduleResolver::new().propose_move(&graph, id, 0).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_task() {
        let graph = TaskGraph::new();
        let id = TaskId::new();
        assert_eq!(
            RescheduleResolver::new().propose_move(&graph, id, 1).unwrap_err(),
            ScheduleError::UnknownTask(id)
        );
    }

    #[test]
    fn test_foundation_push_cascades_into_concrete() {
        let mut graph = TaskGraph::new();
        let a = Task::new(ProjectId::new(), "Foundation", "Foundation", day(0), day(5));
        let b = Task::new(ProjectId::new(), "Slab", "Concrete", day(6), day(10)).with_dependencies([a.id]);
        let (a_id, b_id) = (a.id, b.id);
        graph.add_task(a).unwrap();
        graph.add_task(b).unwrap();

        let proposal = RescheduleResolver::new().propose_move(&graph, a_id, 3).unwrap();
        assert_eq!(proposal.updates[&a_id], ScheduleUpdate { start_date: day(3), end_date: day(8) });
        assert_eq!(proposal.updates[&b_id], ScheduleUpdate { start_date: day(9), end_date: day(13) });
        assert_eq!(proposal.cascaded().count(), 1);
    }

    #[test]
    fn test_move_within_slack_does_not_cascade() {
        let mut graph = TaskGraph::new();
        let a = task("A", 0, 2);
        let b = task("B", 10, 12).with_dependencies([a.id]);
        let (a_id, b_id) = (a.id, b.id);
        graph.add_task(a).unwrap();
        graph.add_task(b).unwrap();

        let proposal = RescheduleResolver::new().propose_move(&graph, a_id, 4).unwrap();
        assert_eq!(proposal.updates.len(), 1);
        assert!(!proposal.updates.contains_key(&b_id));
    }

    #[test]
    fn test_backward_move_never_pulls_dependents() {
        let mut graph = TaskGraph::new();
        let a = task("A", 5, 8);
        let b = task("B", 9, 10).with_dependencies([a.id]);
        let (a_id, b_id) = (a.id, b.id);
        graph.add_task(a).unwrap();
        graph.add_task(b).unwrap();

        let proposal = RescheduleResolver::new().propose_move(&graph, a_id, -3).unwrap();
        assert_eq!(proposal.updates[&a_id].start_date, day(2));
        assert!(!proposal.updates.contains_key(&b_id));
    }

    #[test]
    fn test_drag_before_prerequisite_is_rejected() {
        let mut graph = TaskGraph::new();
        let a = task("A", 0, 5);
        let b = task("B", 6, 8).with_dependencies([a.id]);
        let b_id = b.id;
        graph.add_task(a).unwrap();
        graph.add_task(b).unwrap();

        let err = RescheduleResolver::new().propose_move(&graph, b_id, -1).unwrap_err();
        assert_eq!(
            err,
            ScheduleError::ConstraintViolation {
                task: b_id,
                earliest_start: day(6),
                requested_start: day(5),
            }
        );
    }

    #[test]
    fn test_diamond_uses_latest_prerequisite() {
        // A -> B, A -> C, {B, C} -> D
        let mut graph = TaskGraph::new();
        let a = task("A", 0, 1);
        let b = task("B", 2, 3).with_dependencies([a.id]);
        let c = task("C", 2, 6).with_dependencies([a.id]);
        let d = task("D", 7, 8).with_dependencies([b.id, c.id]);
        let (a_id, b_id, c_id, d_id) = (a.id, b.id, c.id, d.id);
        for t in [a, b, c, d] {
            graph.add_task(t).unwrap();
        }

        let proposal = RescheduleResolver::new().propose_move(&graph, a_id, 2).unwrap();
        assert_eq!(proposal.updates[&b_id].start_date, day(4));
        assert_eq!(proposal.updates[&c_id], ScheduleUpdate { start_date: day(4), end_date: day(8) });
        assert_eq!(proposal.updates[&d_id], ScheduleUpdate { start_date: day(9), end_date: day(10) });

        graph.apply_updates(&proposal.updates).unwrap();
    }
}
