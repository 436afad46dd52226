//! Timeline (Gantt) layout - maps task date ranges onto a pixel grid.
//!
//! Pure: the same tasks and window always produce the same geometry. Tasks
//! outside the visible window still get a rectangle; clipping is left to the
//! renderer.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sitegate_core::{days_between, Date, Task, TaskId, TimelineConfig};

/// Visible window and scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimelineWindow {
    /// First visible day
    pub start: Date,
    /// Number of visible days
    pub days: u32,
    /// Horizontal scale
    pub pixels_per_day: f64,
    /// Height of one row
    pub row_height: f64,
    /// Horizontal offset of arrow control points
    pub arrow_curve: f64,
}

impl TimelineWindow {
    /// Window with default row height and arrow curvature.
    pub fn new(start: Date, days: u32, pixels_per_day: f64) -> Self {
        let defaults = TimelineConfig::default();
        Self {
            start,
            days,
            pixels_per_day,
            row_height: defaults.row_height,
            arrow_curve: defaults.arrow_curve,
        }
    }

    /// Window using configured geometry, clamping the zoom into range.
    pub fn from_config(start: Date, pixels_per_day: f64, config: &TimelineConfig) -> Self {
        Self {
            start,
            days: config.window_days,
            pixels_per_day: config.zoom.clamp(pixels_per_day),
            row_height: config.row_height,
            arrow_curve: config.arrow_curve,
        }
    }

    fn contains_range(&self, start: Date, end: Date) -> bool {
        let after_start = days_between(self.start, end) >= 0;
        let before_end = days_between(self.start, start) < i64::from(self.days);
        after_start && before_end
    }
}

/// A point in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal pixel offset
    pub x: f64,
    /// Vertical pixel offset
    pub y: f64,
}

/// One task bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRect {
    /// Task drawn in this row
    pub task_id: TaskId,
    /// Row index, top to bottom
    pub row: usize,
    /// Left edge, clamped to the window start
    pub x: f64,
    /// Top edge
    pub y: f64,
    /// Bar width, at least one pixel
    pub width: f64,
    /// Bar height
    pub height: f64,
    /// Whether any part of the task falls inside the visible window
    pub in_window: bool,
}

impl TaskRect {
    fn right_center(&self) -> Point {
        Point { x: self.x + self.width, y: self.y + self.height / 2.0 }
    }

    fn left_center(&self) -> Point {
        Point { x: self.x, y: self.y + self.height / 2.0 }
    }
}

/// Dependency arrow from a prerequisite bar to a dependent bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyArrow {
    /// Prerequisite task
    pub from: TaskId,
    /// Dependent task
    pub to: TaskId,
    /// Cubic path: start, control 1, control 2, end
    pub path: [Point; 4],
}

/// Complete drawable geometry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimelineLayout {
    /// One rectangle per task, in row order
    pub rows: Vec<TaskRect>,
    /// Arrows for edges whose both ends are present
    pub arrows: Vec<DependencyArrow>,
    /// Width of the visible window in pixels
    pub width: f64,
    /// Total height of all rows
    pub height: f64,
}

impl TimelineLayout {
    /// Rectangle for a task.
    pub fn rect(&self, id: TaskId) -> Option<&TaskRect> {
        self.rows.iter().find(|r| r.task_id == id)
    }
}

/// Lay out tasks with default row geometry.
pub fn layout(tasks: &[Task], window_start: Date, window_days: u32, pixels_per_day: f64) -> TimelineLayout {
    layout_with(tasks, &TimelineWindow::new(window_start, window_days, pixels_per_day))
}

/// Lay out tasks against an explicit window.
///
/// Rows are ordered by start date; ties keep `created_at` order, then the
/// order of `tasks` itself.
pub fn layout_with(tasks: &[Task], window: &TimelineWindow) -> TimelineLayout {
    let mut ordered: Vec<&Task> = tasks.iter().collect();
    ordered.sort_by(|a, b| a.start_date.cmp(&b.start_date).then(a.created_at.cmp(&b.created_at)));

    let ppd = window.pixels_per_day;
    let rows: Vec<TaskRect> = ordered
        .iter()
        .enumerate()
        .map(|(row, task)| {
            let offset = days_between(window.start, task.start_date) as f64;
            let span = (days_between(task.start_date, task.end_date) + 1) as f64;
            TaskRect {
                task_id: task.id,
                row,
                x: (offset * ppd).max(0.0),
                y: row as f64 * window.row_height,
                width: (span * ppd).max(1.0),
                height: window.row_height,
                in_window: window.contains_range(task.start_date, task.end_date),
            }
        })
        .collect();

    let by_id: HashMap<TaskId, &TaskRect> = rows.iter().map(|r| (r.task_id, r)).collect();
    let mut arrows = Vec::new();
    for task in &ordered {
        let Some(to) = by_id.get(&task.id) else { continue };
        for dep in &task.dependencies {
            let Some(from) = by_id.get(dep) else { continue };
            let start = from.right_center();
            let end = to.left_center();
            arrows.push(DependencyArrow {
                from: *dep,
                to: task.id,
                path: [
                    start,
                    Point { x: start.x + window.arrow_curve, y: start.y },
                    Point { x: end.x - window.arrow_curve, y: end.y },
                    end,
                ],
            });
        }
    }

    TimelineLayout {
        width: f64::from(window.days) * ppd,
        height: rows.len() as f64 * window.row_height,
        rows,
        arrows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitegate_core::ProjectId;

    fn day(d: u32) -> Date {
        Date::from_ymd_opt(2025, 4, d).unwrap()
    }

    fn task(title: &str, start: u32, end: u32) -> Task {
        Task::new(ProjectId::new(), title, "General", day(start), day(end))
    }

    #[test]
    fn test_rect_math() {
        let t = task("A", 3, 5);
        let out = layout(&[t.clone()], day(1), 14, 10.0);
        let rect = out.rect(t.id).unwrap();
        assert_eq!(rect.x, 20.0);
        assert_eq!(rect.width, 30.0);
        assert_eq!(rect.y, 0.0);
        assert!(rect.in_window);
        assert_eq!(out.width, 140.0);
    }

    #[test]
    fn test_task_before_window_is_clamped_not_dropped() {
        let t = task("Early", 1, 2);
        let out = layout(&[t.clone()], day(10), 7, 10.0);
        let rect = out.rect(t.id).unwrap();
        assert_eq!(rect.x, 0.0);
        assert!(!rect.in_window);
    }

    #[test]
    fn test_task_starting_at_window_end_is_outside() {
        let last = task("Last day", 7, 9);
        let after = task("After", 8, 9);
        let out = layout(&[last.clone(), after.clone()], day(1), 7, 10.0);

        assert!(out.rect(last.id).unwrap().in_window);
        let rect = out.rect(after.id).unwrap();
        assert!(!rect.in_window);
        assert_eq!(rect.x, 70.0);
    }

    #[test]
    fn test_width_never_below_one_pixel() {
        let t = task("Tiny", 1, 1);
        let out = layout(&[t.clone()], day(1), 7, 0.25);
        assert_eq!(out.rect(t.id).unwrap().width, 1.0);
    }

    #[test]
    fn test_rows_sorted_by_start_with_stable_ties() {
        let late = task("Late", 9, 10);
        let first = task("First", 2, 3);
        let mut second = task("Second", 2, 4);
        second.created_at = first.created_at;
        let tasks = vec![late.clone(), first.clone(), second.clone()];

        let out = layout(&tasks, day(1), 14, 10.0);
        let ids: Vec<TaskId> = out.rows.iter().map(|r| r.task_id).collect();
        assert_eq!(ids, vec![first.id, second.id, late.id]);
        assert_eq!(out, layout(&tasks, day(1), 14, 10.0));
    }

    #[test]
    fn test_arrow_runs_from_right_edge_to_left_edge() {
        let a = task("A", 1, 2);
        let b = task("B", 4, 5).with_dependencies([a.id]);
        let window = TimelineWindow::new(day(1), 14, 10.0);
        let out = layout_with(&[a.clone(), b.clone()], &window);

        assert_eq!(out.arrows.len(), 1);
        let arrow = &out.arrows[0];
        assert_eq!((arrow.from, arrow.to), (a.id, b.id));
        assert_eq!(arrow.path[0], Point { x: 20.0, y: 16.0 });
        assert_eq!(arrow.path[3], Point { x: 30.0, y: 48.0 });
        assert_eq!(arrow.path[1].x, 20.0 + window.arrow_curve);
        assert_eq!(arrow.path[2].x, 30.0 - window.arrow_curve);
    }

    #[test]
    fn test_arrow_omitted_when_prerequisite_missing() {
        let a = task("A", 1, 2);
        let b = task("B", 4, 5).with_dependencies([a.id]);
        let out = layout(&[b], day(1), 14, 10.0);
        assert!(out.arrows.is_empty());
    }

    #[test]
    fn test_from_config_clamps_zoom() {
        let config = TimelineConfig::default();
        let window = TimelineWindow::from_config(day(1), 1000.0, &config);
        assert_eq!(window.pixels_per_day, config.zoom.max);
    }
}
