//! Task graph - the canonical in-memory store of tasks and their dependencies.
//!
//! All mutations validate before they write, so a rejected call leaves the
//! graph exactly as it was. Dependency edges are never stored separately;
//! they are derived from each task's `dependencies` list.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use sitegate_core::{Date, Task, TaskId, TaskPatch};
use tracing::debug;

use crate::error::{Result, ScheduleError};
use crate::reschedule::ScheduleUpdate;

/// A derived `(prerequisite -> dependent)` edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// Task that must finish first
    pub from: TaskId,
    /// Task that waits on `from`
    pub to: TaskId,
}

/// How `remove_task` treats tasks that still depend on the removed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemovalMode {
    /// Refuse removal while anything depends on the task
    #[default]
    Strict,
    /// Drop the dependency reference from dependents, keeping the dependents
    DetachDependents,
}

/// Result of a successful removal.
#[derive(Debug, Clone)]
pub struct Removal {
    /// The removed task
    pub removed: Task,
    /// Dependents whose dependency lists were rewritten, in their new state
    pub detached: Vec<Task>,
}

/// Task graph for one project.
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    tasks: HashMap<TaskId, Task>,
    /// Insertion (creation) order, used as the stable tie-breaker everywhere
    order: Vec<TaskId>,
}

impl TaskGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from a loaded snapshot, validating it as a whole.
    ///
    /// Tasks may arrive in any order; creation order is restored from
    /// `created_at` (ties broken by id).
    pub fn from_tasks(tasks: impl IntoIterator<Item = Task>) -> Result<Self> {
        let mut tasks: Vec<Task> = tasks.into_iter().collect();
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let mut graph = Self::new();
        for task in tasks {
            validate_fields(&task)?;
            if graph.tasks.contains_key(&task.id) {
                return Err(ScheduleError::Validation(format!("duplicate task id {}", task.id)));
            }
            graph.order.push(task.id);
            graph.tasks.insert(task.id, task);
        }

        for task in graph.tasks.values() {
            graph.check_references(task)?;
        }
        graph.topological_order()?;

        debug!(tasks = graph.len(), "Loaded task graph");
        Ok(graph)
    }

    /// Number of tasks.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the graph holds no tasks.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Get a task by id.
    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    /// Whether a task exists.
    pub fn contains(&self, id: TaskId) -> bool {
        self.tasks.contains_key(&id)
    }

    /// Iterate tasks in creation order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> + '_ {
        self.order.iter().filter_map(|id| self.tasks.get(id))
    }

    /// Clone all tasks in creation order.
    pub fn to_vec(&self) -> Vec<Task> {
        self.tasks().cloned().collect()
    }

    /// Add a new task.
    ///
    /// Rejects duplicate ids, unresolved dependencies, and any dependency
    /// set from which the new task is reachable.
    pub fn add_task(&mut self, task: Task) -> Result<&Task> {
        validate_fields(&task)?;
        if self.tasks.contains_key(&task.id) {
            return Err(ScheduleError::Validation(format!("task {} already exists", task.id)));
        }
        self.check_references(&task)?;

        for dep in &task.dependencies {
            if self.reaches(*dep, task.id) {
                return Err(ScheduleError::CycleDetected(vec![task.id, *dep]));
            }
        }

        let id = task.id;
        debug!(task = %id, deps = task.dependencies.len(), "Adding task");
        self.order.push(id);
        self.tasks.insert(id, task);
        self.get(id).ok_or(ScheduleError::UnknownTask(id))
    }

    /// Apply a partial update to a task.
    ///
    /// When the dependency list changes, acyclicity is re-checked across the
    /// whole graph, not only the edited edges.
    pub fn update_task(&mut self, id: TaskId, patch: &TaskPatch) -> Result<&Task> {
        let current = self.tasks.get(&id).ok_or(ScheduleError::UnknownTask(id))?;

        let mut updated = current.clone();
        patch.apply_to(&mut updated);
        validate_fields(&updated)?;

        if patch.touches_dependencies() {
            self.check_references(&updated)?;
            kahn_order(&self.order, &self.tasks, Some((id, updated.dependencies.as_slice())))
                .map_err(ScheduleError::CycleDetected)?;
        }

        debug!(task = %id, "Updating task");
        self.tasks.insert(id, updated);
        self.get(id).ok_or(ScheduleError::UnknownTask(id))
    }

    /// Remove a task.
    pub fn remove_task(&mut self, id: TaskId, mode: RemovalMode) -> Result<Removal> {
        if !self.tasks.contains_key(&id) {
            return Err(ScheduleError::UnknownTask(id));
        }

        let dependents = self.dependents_of(id);
        if !dependents.is_empty() && mode == RemovalMode::Strict {
            return Err(ScheduleError::ReferentialIntegrity { task: id, dependents });
        }

        let mut detached = Vec::with_capacity(dependents.len());
        for dep_id in dependents {
            if let Some(dependent) = self.tasks.get_mut(&dep_id) {
                dependent.dependencies.retain(|d| *d != id);
                dependent.updated_at = chrono::Utc::now();
                detached.push(dependent.clone());
            }
        }

        self.order.retain(|t| *t != id);
        let removed = self.tasks.remove(&id).ok_or(ScheduleError::UnknownTask(id))?;
        debug!(task = %id, detached = detached.len(), "Removed task");
        Ok(Removal { removed, detached })
    }

    /// Tasks ordered so that every prerequisite precedes its dependents.
    ///
    /// Among tasks that are ready at the same time, creation order wins.
    pub fn topological_order(&self) -> Result<Vec<TaskId>> {
        kahn_order(&self.order, &self.tasks, None).map_err(ScheduleError::CycleDetected)
    }

    /// Tasks that list `id` directly, in creation order.
    pub fn dependents_of(&self, id: TaskId) -> Vec<TaskId> {
        self.tasks()
            .filter(|t| t.depends_on(id))
            .map(|t| t.id)
            .collect()
    }

    /// Every task that transitively depends on `id`.
    pub fn descendants_of(&self, id: TaskId) -> HashSet<TaskId> {
        let reverse = self.reverse_edges();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([id]);

        while let Some(current) = queue.pop_front() {
            if let Some(children) = reverse.get(&current) {
                for child in children {
                    if seen.insert(*child) {
                        queue.push_back(*child);
                    }
                }
            }
        }
        seen
    }

    /// All dependency edges, in dependent creation order.
    pub fn edges(&self) -> Vec<DependencyEdge> {
        self.tasks()
            .flat_map(|t| t.dependencies.iter().map(move |d| DependencyEdge { from: *d, to: t.id }))
            .collect()
    }

    /// First day a task may start: the day after its latest prerequisite ends.
    ///
    /// `None` when the task has no prerequisites.
    pub fn earliest_start(&self, id: TaskId) -> Option<Date> {
        let task = self.tasks.get(&id)?;
        task.dependencies
            .iter()
            .filter_map(|d| self.tasks.get(d))
            .map(|d| d.end_date)
            .max()
            .and_then(|end| end.succ_opt())
    }

    /// Apply a set of date updates all-or-nothing.
    ///
    /// Every id must exist, every range must be well-formed, and after the
    /// change every touched task must still start after all of its
    /// prerequisites end (and before none of its dependents). On any failure
    /// nothing is written.
    pub fn apply_updates(&mut self, updates: &BTreeMap<TaskId, ScheduleUpdate>) -> Result<Vec<Task>> {
        for (id, update) in updates {
            if !self.tasks.contains_key(id) {
                return Err(ScheduleError::UnknownTask(*id));
            }
            if update.end_date < update.start_date {
                return Err(ScheduleError::Validation(format!(
                    "task {} would end ({}) before it starts ({})",
                    id, update.end_date, update.start_date
                )));
            }
        }

        let dates = |t: TaskId| -> Option<(Date, Date)> {
            updates
                .get(&t)
                .map(|u| (u.start_date, u.end_date))
                .or_else(|| self.tasks.get(&t).map(|t| (t.start_date, t.end_date)))
        };

        let mut to_check: BTreeSet<TaskId> = updates.keys().copied().collect();
        for id in updates.keys() {
            to_check.extend(self.dependents_of(*id));
        }

        for id in &to_check {
            let Some(task) = self.tasks.get(id) else { continue };
            let Some((start, _)) = dates(*id) else { continue };
            let latest_end = task.dependencies.iter().filter_map(|d| dates(*d)).map(|(_, end)| end).max();
            if let Some(latest_end) = latest_end {
                if start <= latest_end {
                    return Err(ScheduleError::ConstraintViolation {
                        task: *id,
                        earliest_start: latest_end.succ_opt().unwrap_or(latest_end),
                        requested_start: start,
                    });
                }
            }
        }

        let now = chrono::Utc::now();
        let mut applied = Vec::with_capacity(updates.len());
        for (id, update) in updates {
            if let Some(task) = self.tasks.get_mut(id) {
                task.start_date = update.start_date;
                task.end_date = update.end_date;
                task.updated_at = now;
                applied.push(task.clone());
            }
        }
        debug!(tasks = applied.len(), "Applied schedule updates");
        Ok(applied)
    }

    fn reverse_edges(&self) -> HashMap<TaskId, Vec<TaskId>> {
        let mut reverse: HashMap<TaskId, Vec<TaskId>> = HashMap::new();
        for edge in self.edges() {
            reverse.entry(edge.from).or_default().push(edge.to);
        }
        reverse
    }

    /// Whether `target` is reachable from `start` by following dependencies.
    fn reaches(&self, start: TaskId, target: TaskId) -> bool {
        let mut visited = HashSet::new();
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            if current == target {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(task) = self.tasks.get(&current) {
                stack.extend(task.dependencies.iter().copied());
            }
        }
        false
    }

    fn check_references(&self, task: &Task) -> Result<()> {
        for dep in &task.dependencies {
            if *dep == task.id {
                return Err(ScheduleError::Validation(format!("task {} depends on itself", task.id)));
            }
            if !self.tasks.contains_key(dep) {
                return Err(ScheduleError::Validation(format!(
                    "task {} depends on unknown task {}",
                    task.id, dep
                )));
            }
        }
        Ok(())
    }
}

fn validate_fields(task: &Task) -> Result<()> {
    if task.title.trim().is_empty() {
        return Err(ScheduleError::Validation(format!("task {} has an empty title", task.id)));
    }
    if task.end_date < task.start_date {
        return Err(ScheduleError::Validation(format!(
            "task {} ends ({}) before it starts ({})",
            task.id, task.end_date, task.start_date
        )));
    }
    if task.progress_percentage > 100 {
        return Err(ScheduleError::Validation(format!(
            "task {} progress {} is outside 0-100",
            task.id, task.progress_percentage
        )));
    }
    let mut seen = HashSet::new();
    if !task.dependencies.iter().all(|d| seen.insert(*d)) {
        return Err(ScheduleError::Validation(format!("task {} lists a dependency twice", task.id)));
    }
    Ok(())
}

/// Kahn's algorithm over `order`, picking ready tasks by creation position.
///
/// `replaced` substitutes one task's dependency list, so a candidate update
/// can be checked before it is written. On failure returns the tasks that
/// could not be ordered (cycle members and anything downstream of them).
fn kahn_order(
    order: &[TaskId],
    tasks: &HashMap<TaskId, Task>,
    replaced: Option<(TaskId, &[TaskId])>,
) -> std::result::Result<Vec<TaskId>, Vec<TaskId>> {
    let deps_of = |id: &TaskId| -> Vec<TaskId> {
        match replaced {
            Some((rid, deps)) if rid == *id => deps.to_vec(),
            _ => tasks.get(id).map(|t| t.dependencies.clone()).unwrap_or_default(),
        }
    };

    let position: HashMap<TaskId, usize> = order.iter().enumerate().map(|(i, id)| (*id, i)).collect();
    let mut remaining: Vec<usize> = vec![0; order.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); order.len()];

    for (i, id) in order.iter().enumerate() {
        for dep in deps_of(id) {
            if let Some(&p) = position.get(&dep) {
                remaining[i] += 1;
                dependents[p].push(i);
            }
        }
    }

    let mut ready: BTreeSet<usize> = (0..order.len()).filter(|i| remaining[*i] == 0).collect();
    let mut sorted = Vec::with_capacity(order.len());

    while let Some(i) = ready.pop_first() {
        sorted.push(order[i]);
        for &d in &dependents[i] {
            remaining[d] -= 1;
            if remaining[d] == 0 {
                ready.insert(d);
            }
        }
    }

    if sorted.len() == order.len() {
        Ok(sorted)
    } else {
        let stuck = (0..order.len()).filter(|i| remaining[*i] > 0).map(|i| order[i]).collect();
        Err(stuck)
    }
}
