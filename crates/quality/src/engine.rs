//! QA rule engine - turns observed task changes into inspection alerts.
//!
//! The engine is pure: it reads a mutation event plus the currently live
//! alerts and returns what should be created. It never touches a task and
//! never writes anywhere; the caller persists the returned alerts and hands
//! the notifications to a sink.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sitegate_core::{
    days_between, shift_days, AlertId, AlertStatus, Date, Notification, QaAlert, Task, TaskId,
    TaskMutationEvent, TaskStatus,
};
use tracing::{debug, info};

use crate::error::{QualityError, Result};
use crate::registry::RuleRegistry;
use crate::rules::{QaRule, Trigger};

/// Outcome of evaluating one event or one scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Newly raised alerts
    pub alerts: Vec<QaAlert>,
    /// Notifications for the new alerts that have an assignee
    pub notifications: Vec<Notification>,
    /// Matches suppressed because a live alert already covers them
    pub duplicates_skipped: usize,
}

impl Evaluation {
    /// Whether nothing new was raised.
    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    /// Fold another evaluation into this one.
    pub fn merge(&mut self, other: Evaluation) {
        self.alerts.extend(other.alerts);
        self.notifications.extend(other.notifications);
        self.duplicates_skipped += other.duplicates_skipped;
    }
}

/// Rule-trigger engine.
#[derive(Debug, Clone, Default)]
pub struct QaRuleEngine {
    registry: RuleRegistry,
}

impl QaRuleEngine {
    /// Engine over the built-in rule table.
    pub fn new() -> Self {
        Self::with_registry(RuleRegistry::builtin())
    }

    /// Engine over a custom rule set.
    pub fn with_registry(registry: RuleRegistry) -> Self {
        Self { registry }
    }

    /// Rules in use.
    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Evaluate a task mutation.
    ///
    /// Safe to call repeatedly for the same logical event: a rule that
    /// already has a live alert on the task is skipped, so re-delivery
    /// raises nothing and notifies nobody.
    pub fn on_task_event(&self, event: &TaskMutationEvent, live_alerts: &[QaAlert], today: Date) -> Evaluation {
        let mut seen: HashSet<(TaskId, String)> = live_alerts
            .iter()
            .map(|a| (a.task_id, a.rule_type.clone()))
            .collect();
        self.evaluate(event, &mut seen, today)
    }

    /// Periodic schedule-proximity pass over every task.
    ///
    /// Each task is treated as a re-observation, so only proximity rules
    /// can fire.
    pub fn scan<'a>(
        &self,
        tasks: impl IntoIterator<Item = &'a Task>,
        live_alerts: &[QaAlert],
        today: Date,
    ) -> Evaluation {
        let mut seen: HashSet<(TaskId, String)> = live_alerts
            .iter()
            .map(|a| (a.task_id, a.rule_type.clone()))
            .collect();

        let mut out = Evaluation::default();
        for task in tasks {
            let event = TaskMutationEvent::observed(task.clone());
            out.merge(self.evaluate(&event, &mut seen, today));
        }
        out
    }

    /// Whether `rule` fires for `event` on `today`, ignoring deduplication.
    pub fn matches(rule: &QaRule, event: &TaskMutationEvent, today: Date) -> bool {
        let task = &event.task;
        match &rule.trigger {
            Trigger::ScheduleProximity { days_before } => {
                let days_until = days_between(today, task.start_date);
                (0..=*days_before).contains(&days_until)
                    && !matches!(task.status, TaskStatus::Completed | TaskStatus::Cancelled)
            }
            Trigger::StatusTransition { into, min_progress, .. } => {
                into.contains(&task.status)
                    && event.status_changed()
                    && min_progress.map_or(true, |min| task.progress_percentage >= min)
            }
        }
    }

    /// Reject an alert that would duplicate a live one.
    ///
    /// The engine never produces such alerts itself; this guards writes that
    /// bypass it.
    pub fn ensure_unique(alert: &QaAlert, live_alerts: &[QaAlert]) -> Result<()> {
        let clash = live_alerts
            .iter()
            .any(|a| a.id != alert.id && a.matches(alert.task_id, &alert.rule_type));
        if clash {
            return Err(QualityError::DuplicateAlert {
                task: alert.task_id,
                rule_type: alert.rule_type.clone(),
            });
        }
        Ok(())
    }

    fn evaluate(
        &self,
        event: &TaskMutationEvent,
        seen: &mut HashSet<(TaskId, String)>,
        today: Date,
    ) -> Evaluation {
        let task = &event.task;
        let mut out = Evaluation::default();

        for rule in self.registry.find_by_category(&task.category) {
            if !Self::matches(rule, event, today) {
                continue;
            }
            if !seen.insert((task.id, rule.key.clone())) {
                debug!(task = %task.id, rule = %rule.key, "Live alert exists, skipping");
                out.duplicates_skipped += 1;
                continue;
            }

            let mut alert = materialize(rule, task, today);
            if let Some(notification) = Notification::for_alert(&alert) {
                alert.notified = true;
                out.notifications.push(notification);
            }
            info!(
                task = %task.id,
                rule = %rule.key,
                priority = %alert.priority,
                "Raised QA alert: {}",
                alert.title
            );
            out.alerts.push(alert);
        }
        out
    }
}

fn materialize(rule: &QaRule, task: &Task, today: Date) -> QaAlert {
    let due_date = match &rule.trigger {
        // the day before start, but never already overdue
        Trigger::ScheduleProximity { .. } => task
            .start_date
            .pred_opt()
            .unwrap_or(task.start_date)
            .max(today),
        Trigger::StatusTransition { due_offset_days, .. } => {
            shift_days(today, *due_offset_days).unwrap_or(today)
        }
    };

    let now = chrono::Utc::now();
    QaAlert {
        id: AlertId::new(),
        project_id: task.project_id,
        task_id: task.id,
        rule_type: rule.key.clone(),
        rule_kind: rule.trigger.kind(),
        status: AlertStatus::Pending,
        title: rule.title.clone(),
        description: format!("{}: {}", task.title, rule.description),
        due_date,
        priority: rule.priority,
        assigned_to: task.assignee.clone(),
        checklist: rule.instantiate_checklist(),
        completed_by: None,
        completed_at: None,
        notified: false,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitegate_core::{Priority, ProjectId, RuleKind};

    fn today() -> Date {
        Date::from_ymd_opt(2025, 5, 10).unwrap()
    }

    fn in_days(n: u64) -> Date {
        today().checked_add_days(chrono::Days::new(n)).unwrap()
    }

    fn pour_slab() -> Task {
        Task::new(ProjectId::new(), "Pour Slab", "Concrete", in_days(10), in_days(12))
            .with_assignee("kim")
    }

    #[test]
    fn test_concrete_transition_fires_once() {
        let engine = QaRuleEngine::new();
        let before = pour_slab();
        let previous = before.snapshot();
        let event = TaskMutationEvent::updated(before.with_status(TaskStatus::InProgress), previous);

        let first = engine.on_task_event(&event, &[], today());
        assert_eq!(first.alerts.len(), 1);
        let alert = &first.alerts[0];
        assert_eq!(alert.rule_type, "concrete_pre_pour");
        assert_eq!(alert.rule_kind, RuleKind::StatusTransition);
        assert_eq!(alert.priority, Priority::Critical);
        assert_eq!(alert.checklist.iter().filter(|i| i.required).count(), 3);
        assert_eq!(alert.due_date, today());
        assert!(alert.notified);
        assert_eq!(first.notifications.len(), 1);
        assert!(first.notifications[0].title.starts_with("[CRITICAL] "));

        let second = engine.on_task_event(&event, &first.alerts, today());
        assert!(second.is_empty());
        assert!(second.notifications.is_empty());
        assert_eq!(second.duplicates_skipped, 1);
    }

    #[test]
    fn test_no_transition_no_alert() {
        let engine = QaRuleEngine::new();
        let task = pour_slab().with_status(TaskStatus::InProgress);
        let event = TaskMutationEvent::observed(task);
        assert!(engine.on_task_event(&event, &[], today()).is_empty());
    }

    #[test]
    fn test_first_observation_counts_as_transition() {
        let engine = QaRuleEngine::new();
        let task = pour_slab().with_status(TaskStatus::InProgress);
        let out = engine.on_task_event(&TaskMutationEvent::created(task), &[], today());
        assert_eq!(out.alerts.len(), 1);
    }

    #[test]
    fn test_progress_threshold_gates_status_rule() {
        let engine = QaRuleEngine::new();
        let base = Task::new(ProjectId::new(), "Erect frame", "Steel", in_days(20), in_days(30));
        let previous = base.snapshot();

        let early = base.clone().with_status(TaskStatus::InProgress).with_progress(30);
        let out = engine.on_task_event(&TaskMutationEvent::updated(early, previous.clone()), &[], today());
        assert!(out.is_empty());

        let halfway = base.with_status(TaskStatus::InProgress).with_progress(50);
        let out = engine.on_task_event(&TaskMutationEvent::updated(halfway, previous), &[], today());
        assert_eq!(out.alerts.len(), 1);
        assert_eq!(out.alerts[0].rule_type, "steel_connections");
        assert!(out.notifications.is_empty());
    }

    #[test]
    fn test_proximity_window() {
        let engine = QaRuleEngine::new();
        let rule = engine.registry().get("foundation_excavation").unwrap().clone();
        let at = |n: u64| {
            let task = Task::new(ProjectId::new(), "Dig", "Foundation", in_days(n), in_days(n + 2));
            TaskMutationEvent::observed(task)
        };

        assert!(QaRuleEngine::matches(&rule, &at(0), today()));
        assert!(QaRuleEngine::matches(&rule, &at(3), today()));
        assert!(!QaRuleEngine::matches(&rule, &at(4), today()));

        let past = Task::new(ProjectId::new(), "Dig", "Foundation", in_days(0), in_days(2));
        assert!(!QaRuleEngine::matches(&rule, &TaskMutationEvent::observed(past), in_days(1)));

        let done = Task::new(ProjectId::new(), "Dig", "Foundation", in_days(1), in_days(2))
            .with_status(TaskStatus::Completed);
        assert!(!QaRuleEngine::matches(&rule, &TaskMutationEvent::observed(done), today()));
    }

    #[test]
    fn test_scan_raises_proximity_alerts_due_day_before_start() {
        let engine = QaRuleEngine::new();
        let dig = Task::new(ProjectId::new(), "Dig", "Foundation", in_days(2), in_days(5));
        let far = Task::new(ProjectId::new(), "Later", "Foundation", in_days(30), in_days(35));

        let out = engine.scan([&dig, &far], &[], today());
        assert_eq!(out.alerts.len(), 1);
        assert_eq!(out.alerts[0].task_id, dig.id);
        assert_eq!(out.alerts[0].rule_kind, RuleKind::ScheduleProximity);
        assert_eq!(out.alerts[0].due_date, in_days(1));

        let again = engine.scan([&dig, &far], &out.alerts, today());
        assert!(again.is_empty());
    }

    #[test]
    fn test_same_day_proximity_alert_is_due_today() {
        let engine = QaRuleEngine::new();
        let dig = Task::new(ProjectId::new(), "Dig", "Foundation", today(), in_days(3));

        let out = engine.scan([&dig], &[], today());
        assert_eq!(out.alerts.len(), 1);
        assert_eq!(out.alerts[0].due_date, today());
    }

    #[test]
    fn test_unknown_category_is_not_an_error() {
        let engine = QaRuleEngine::new();
        let task = Task::new(ProjectId::new(), "Plant trees", "Landscaping", today(), today())
            .with_status(TaskStatus::InProgress);
        assert!(engine.on_task_event(&TaskMutationEvent::created(task), &[], today()).is_empty());
    }

    #[test]
    fn test_status_rule_due_offset() {
        let engine = QaRuleEngine::new();
        let task = Task::new(ProjectId::new(), "Footings", "Foundation", in_days(20), in_days(25));
        let previous = task.snapshot();
        let done = task.with_status(TaskStatus::Completed);
        let out = engine.on_task_event(&TaskMutationEvent::updated(done, previous), &[], today());
        let signoff = out.alerts.iter().find(|a| a.rule_type == "foundation_signoff").unwrap();
        assert_eq!(signoff.due_date, in_days(1));
    }

    #[test]
    fn test_ensure_unique() {
        let engine = QaRuleEngine::new();
        let task = pour_slab().with_status(TaskStatus::InProgress);
        let out = engine.on_task_event(&TaskMutationEvent::created(task), &[], today());
        let existing = out.alerts[0].clone();

        assert!(QaRuleEngine::ensure_unique(&existing, &out.alerts).is_ok());

        let mut copy = existing.clone();
        copy.id = AlertId::new();
        assert!(matches!(
            QaRuleEngine::ensure_unique(&copy, &out.alerts),
            Err(QualityError::DuplicateAlert { .. })
        ));
    }
}
