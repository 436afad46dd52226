//! Project coordinator - the single writer for one project's schedule.
//!
//! Every task mutation runs against a scratch copy of the graph, is persisted,
//! and only then replaces the live graph. QA evaluation follows as a
//! best-effort step: its failures are logged and never undo the mutation.

use std::collections::HashMap;
use std::sync::Arc;

use sitegate_core::{
    AlertId, AlertStatus, ChecklistItemId, Date, ProjectId, QaAlert, SitegateConfig, Task,
    TaskId, TaskMutationEvent, TaskPatch, TaskSnapshot,
};
use sitegate_quality::{
    sink_from_config, ChecklistMachine, CompletionOutcome, Evaluation, NotificationSink,
    QaRuleEngine, QualityError,
};
use sitegate_schedule::{
    layout_with, MoveProposal, Removal, RemovalMode, RescheduleResolver, ScheduleError,
    TaskGraph, TimelineLayout, TimelineWindow,
};
use sitegate_storage::{AlertStore, StorageError, TaskStore};
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{Result, WorkError};

/// Result of a task mutation plus the QA alerts it raised.
#[derive(Debug, Clone)]
pub struct Outcome<T> {
    /// What the mutation produced
    pub value: T,
    /// Alerts raised and stored as a consequence
    pub raised: Vec<QaAlert>,
}

/// Timeline view parameters. Unset fields fall back to configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimelineRequest {
    /// First visible day; defaults to the earliest task start, or today
    pub from: Option<Date>,
    /// Visible days
    pub days: Option<u32>,
    /// Requested zoom, clamped into the configured range
    pub pixels_per_day: Option<f64>,
}

/// Coordinates one project's graph, rules, storage and notifications.
pub struct ProjectCoordinator<S> {
    project: ProjectId,
    storage: S,
    graph: TaskGraph,
    engine: QaRuleEngine,
    resolver: RescheduleResolver,
    sink: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    config: SitegateConfig,
}

impl<S: TaskStore + AlertStore> ProjectCoordinator<S> {
    /// Load a project's tasks and build its graph.
    pub async fn open(project: ProjectId, storage: S, config: SitegateConfig) -> Result<Self> {
        let tasks = storage.load_tasks(project).await?;
        let graph = TaskGraph::from_tasks(tasks)?;
        info!(project = %project, tasks = graph.len(), "Opened project");

        Ok(Self {
            project,
            storage,
            graph,
            engine: QaRuleEngine::new(),
            resolver: RescheduleResolver::new(),
            sink: sink_from_config(&config.quality),
            clock: Arc::new(SystemClock),
            config,
        })
    }

    /// Use a custom rule engine.
    pub fn with_engine(mut self, engine: QaRuleEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Deliver notifications to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Take "today" from `clock`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Project being coordinated.
    pub fn project(&self) -> ProjectId {
        self.project
    }

    /// Current task graph.
    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// Underlying storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Today according to the configured clock.
    pub fn today(&self) -> Date {
        self.clock.today()
    }

    /// Add a task and evaluate it as a first observation.
    pub async fn add_task(&mut self, task: Task) -> Result<Outcome<Task>> {
        if task.project_id != self.project {
            return Err(ScheduleError::Validation(format!(
                "task {} belongs to project {}, not {}",
                task.id, task.project_id, self.project
            ))
            .into());
        }

        let mut scratch = self.graph.clone();
        let stored = scratch.add_task(task)?.clone();
        self.storage
            .save_task_updates(self.project, std::slice::from_ref(&stored))
            .await?;
        self.graph = scratch;
        info!(task = %stored.id, title = %stored.title, "Added task");

        let raised = self.run_quality(vec![TaskMutationEvent::created(stored.clone())]).await;
        Ok(Outcome { value: stored, raised })
    }

    /// Apply a partial update.
    pub async fn update_task(&mut self, id: TaskId, patch: &TaskPatch) -> Result<Outcome<Task>> {
        let previous = self
            .graph
            .get(id)
            .ok_or(ScheduleError::UnknownTask(id))?
            .snapshot();

        let mut scratch = self.graph.clone();
        let updated = scratch.update_task(id, patch)?.clone();
        self.storage
            .save_task_updates(self.project, std::slice::from_ref(&updated))
            .await?;
        self.graph = scratch;
        debug!(task = %id, status = %updated.status, "Updated task");

        let raised = self
            .run_quality(vec![TaskMutationEvent::updated(updated.clone(), previous)])
            .await;
        Ok(Outcome { value: updated, raised })
    }

    /// Remove a task. Its alerts are kept.
    pub async fn remove_task(&mut self, id: TaskId, mode: RemovalMode) -> Result<Removal> {
        let mut scratch = self.graph.clone();
        let removal = scratch.remove_task(id, mode)?;

        if !removal.detached.is_empty() {
            self.storage.save_task_updates(self.project, &removal.detached).await?;
        }
        self.storage.delete_task(self.project, id).await?;
        self.graph = scratch;
        info!(task = %id, detached = removal.detached.len(), "Removed task");
        Ok(removal)
    }

    /// Preview a drag without applying it.
    pub fn propose_move(&self, id: TaskId, day_delta: i64) -> Result<MoveProposal> {
        Ok(self.resolver.propose_move(&self.graph, id, day_delta)?)
    }

    /// Move a task by `day_delta` days, cascading to its dependents.
    ///
    /// Returns every task whose dates changed, the dragged task first.
    pub async fn move_task(&mut self, id: TaskId, day_delta: i64) -> Result<Outcome<Vec<Task>>> {
        let proposal = self.resolver.propose_move(&self.graph, id, day_delta)?;
        if proposal.is_empty() {
            return Ok(Outcome { value: Vec::new(), raised: Vec::new() });
        }

        let previous: HashMap<TaskId, TaskSnapshot> = proposal
            .updates
            .keys()
            .filter_map(|t| self.graph.get(*t).map(|task| (*t, task.snapshot())))
            .collect();

        let mut scratch = self.graph.clone();
        let mut changed = scratch.apply_updates(&proposal.updates)?;
        self.storage.save_task_updates(self.project, &changed).await?;
        self.graph = scratch;

        changed.sort_by_key(|t| t.id != id);
        info!(
            task = %id,
            delta = day_delta,
            cascaded = changed.len().saturating_sub(1),
            "Applied move"
        );

        let events = changed
            .iter()
            .map(|task| match previous.get(&task.id) {
                Some(prev) => TaskMutationEvent::updated(task.clone(), prev.clone()),
                None => TaskMutationEvent::observed(task.clone()),
            })
            .collect();
        let raised = self.run_quality(events).await;
        Ok(Outcome { value: changed, raised })
    }

    /// Run the schedule-proximity pass over every task.
    pub async fn scan_schedule(&mut self) -> Result<Vec<QaAlert>> {
        if !self.config.quality.enabled {
            return Ok(Vec::new());
        }
        let live = self.storage.list_live_alerts(self.project).await?;
        let evaluation = self.engine.scan(self.graph.tasks(), &live, self.clock.today());
        debug!(
            raised = evaluation.alerts.len(),
            skipped = evaluation.duplicates_skipped,
            "Schedule scan finished"
        );
        Ok(self.record(evaluation).await)
    }

    /// Complete one checklist item, closing the alert when it was the last
    /// required one.
    pub async fn complete_checklist_item(
        &mut self,
        alert_id: AlertId,
        item_id: ChecklistItemId,
        completed_by: &str,
        notes: Option<String>,
    ) -> Result<(QaAlert, CompletionOutcome)> {
        self.load_owned_alert(alert_id).await?;
        self.storage
            .record_checklist_completion(alert_id, item_id, completed_by, notes)
            .await
            .map_err(|e| match e {
                StorageError::Quality(q) => WorkError::Quality(q),
                other => WorkError::Storage(other),
            })
    }

    /// Manually override an alert's status.
    pub async fn set_alert_status(
        &mut self,
        alert_id: AlertId,
        status: AlertStatus,
        completed_by: Option<String>,
    ) -> Result<QaAlert> {
        let mut alert = self.load_owned_alert(alert_id).await?;
        ChecklistMachine::set_status(&mut alert, status, completed_by);
        self.storage.upsert_alert(&alert).await?;
        Ok(alert)
    }

    /// Delete an alert. The rule may fire again for the same task afterwards.
    pub async fn delete_alert(&mut self, alert_id: AlertId) -> Result<()> {
        self.load_owned_alert(alert_id).await?;
        self.storage.delete_alert(alert_id).await?;
        info!(alert = %alert_id, "Deleted alert");
        Ok(())
    }

    /// Every stored alert of the project, oldest first.
    pub async fn alerts(&self) -> Result<Vec<QaAlert>> {
        Ok(self.storage.list_live_alerts(self.project).await?)
    }

    /// Lay out the current schedule.
    pub fn timeline(&self, request: &TimelineRequest) -> TimelineLayout {
        let config = &self.config.timeline;
        let from = request
            .from
            .or_else(|| self.graph.tasks().map(|t| t.start_date).min())
            .unwrap_or_else(|| self.clock.today());
        let zoom = request.pixels_per_day.unwrap_or(config.default_pixels_per_day);

        let mut window = TimelineWindow::from_config(from, zoom, config);
        if let Some(days) = request.days {
            window.days = days;
        }

        let tasks = self.graph.to_vec();
        layout_with(&tasks, &window)
    }

    async fn load_owned_alert(&self, alert_id: AlertId) -> Result<QaAlert> {
        match self.storage.load_alert(alert_id).await? {
            Some(alert) if alert.project_id == self.project => Ok(alert),
            _ => Err(QualityError::UnknownAlert(alert_id).into()),
        }
    }

    async fn run_quality(&mut self, events: Vec<TaskMutationEvent>) -> Vec<QaAlert> {
        if !self.config.quality.enabled {
            return Vec::new();
        }

        let mut live = match self.storage.list_live_alerts(self.project).await {
            Ok(live) => live,
            Err(e) => {
                warn!(project = %self.project, error = %e, "Skipping QA evaluation: live alerts unavailable");
                return Vec::new();
            }
        };

        let today = self.clock.today();
        let mut evaluation = Evaluation::default();
        for event in &events {
            let next = self.engine.on_task_event(event, &live, today);
            live.extend(next.alerts.iter().cloned());
            evaluation.merge(next);
        }
        self.record(evaluation).await
    }

    async fn record(&mut self, evaluation: Evaluation) -> Vec<QaAlert> {
        let Evaluation { alerts, notifications, .. } = evaluation;
        let notify = self.config.quality.notifications;

        let mut stored = Vec::with_capacity(alerts.len());
        for mut alert in alerts {
            if !notify {
                alert.notified = false;
            }
            if let Err(e) = self.storage.upsert_alert(&alert).await {
                warn!(alert = %alert.id, task = %alert.task_id, error = %e, "Failed to store QA alert");
                continue;
            }
            if notify {
                if let Some(notification) = notifications.iter().find(|n| n.alert_id == alert.id) {
                    self.sink.publish(notification).await;
                }
            }
            stored.push(alert);
        }
        stored
    }
}
