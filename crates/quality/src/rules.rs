//! QA rules - declarative inspection triggers per trade category.

use serde::{Deserialize, Serialize};
use sitegate_core::{ChecklistItem, Priority, RuleKind, TaskStatus};

/// When a rule fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    /// Task start is at most `days_before` days away (and not in the past)
    ScheduleProximity {
        /// Look-ahead window in days
        days_before: i64,
    },

    /// Task enters one of `into`
    StatusTransition {
        /// Statuses that fire the rule
        into: Vec<TaskStatus>,
        /// Progress the task must have reached, if any
        min_progress: Option<u8>,
        /// Days after the transition the alert falls due
        due_offset_days: i64,
    },
}

impl Trigger {
    /// Kind of this trigger.
    pub fn kind(&self) -> RuleKind {
        match self {
            Trigger::ScheduleProximity { .. } => RuleKind::ScheduleProximity,
            Trigger::StatusTransition { .. } => RuleKind::StatusTransition,
        }
    }
}

/// One line of a checklist template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistTemplateItem {
    /// Instruction text
    pub text: String,
    /// Whether the item gates completion
    pub required: bool,
}

/// A static inspection rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaRule {
    /// Stable key, copied into `QaAlert::rule_type`
    pub key: String,
    /// Task category this rule applies to
    pub category: String,
    /// Firing condition
    pub trigger: Trigger,
    /// Priority of raised alerts
    pub priority: Priority,
    /// Alert title
    pub title: String,
    /// Alert description
    pub description: String,
    /// Ordered checklist template
    pub checklist: Vec<ChecklistTemplateItem>,
}

impl QaRule {
    /// Instantiate the checklist template with fresh item ids.
    pub fn instantiate_checklist(&self) -> Vec<ChecklistItem> {
        self.checklist
            .iter()
            .map(|item| ChecklistItem::new(item.text.clone(), item.required))
            .collect()
    }
}

/// Builder for QA rules.
pub struct QaRuleBuilder {
    rule: QaRule,
}

impl QaRuleBuilder {
    /// Start a rule with the given key and category.
    pub fn new(key: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            rule: QaRule {
                key: key.into(),
                category: category.into(),
                trigger: Trigger::ScheduleProximity { days_before: 1 },
                priority: Priority::Medium,
                title: String::new(),
                description: String::new(),
                checklist: Vec::new(),
            },
        }
    }

    /// Fire when the task start is within `days` days.
    pub fn before_start(mut self, days: i64) -> Self {
        self.rule.trigger = Trigger::ScheduleProximity { days_before: days };
        self
    }

    /// Fire when the task enters any of `statuses`.
    pub fn on_status(mut self, statuses: impl IntoIterator<Item = TaskStatus>) -> Self {
        self.rule.trigger = Trigger::StatusTransition {
            into: statuses.into_iter().collect(),
            min_progress: None,
            due_offset_days: 0,
        };
        self
    }

    /// Require a minimum progress for status triggers.
    pub fn min_progress(mut self, progress: u8) -> Self {
        if let Trigger::StatusTransition { min_progress, .. } = &mut self.rule.trigger {
            *min_progress = Some(progress);
        }
        self
    }

    /// Make status-triggered alerts fall due `days` after the transition.
    pub fn due_after(mut self, days: i64) -> Self {
        if let Trigger::StatusTransition { due_offset_days, .. } = &mut self.rule.trigger {
            *due_offset_days = days;
        }
        self
    }

    /// Set priority.
    pub fn priority(mut self, priority: Priority) -> Self {
        self.rule.priority = priority;
        self
    }

    /// Set title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.rule.title = title.into();
        self
    }

    /// Set description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.rule.description = description.into();
        self
    }

    /// Add a required checklist item.
    pub fn required(mut self, text: impl Into<String>) -> Self {
        self.rule.checklist.push(ChecklistTemplateItem { text: text.into(), required: true });
        self
    }

    /// Add an optional checklist item.
    pub fn optional(mut self, text: impl Into<String>) -> Self {
        self.rule.checklist.push(ChecklistTemplateItem { text: text.into(), required: false });
        self
    }

    /// Build the rule.
    pub fn build(self) -> QaRule {
        self.rule
    }
}

/// The built-in inspection table.
pub fn builtin_rules() -> Vec<QaRule> {
    use TaskStatus::*;

    vec![
        QaRuleBuilder::new("concrete_pre_pour", "Concrete")
            .on_status([InProgress])
            .priority(Priority::Critical)
            .title("Pre-pour concrete inspection")
            .description("Formwork, reinforcement and mix must be signed off before the pour starts")
            .required("Formwork inspected for alignment, bracing and cleanliness")
            .required("Reinforcement size, spacing and cover verified against drawings")
            .required("Mix design and delivery tickets checked")
            .build(),
        QaRuleBuilder::new("concrete_pour_booking", "Concrete")
            .before_start(2)
            .priority(Priority::High)
            .title("Concrete pour booking")
            .description("Confirm supply and site readiness ahead of the scheduled pour")
            .required("Ready-mix delivery booked and confirmed")
            .required("Weather forecast reviewed for pour day")
            .optional("Pump and finishing crew confirmed")
            .build(),
        QaRuleBuilder::new("concrete_curing", "Concrete")
            .on_status([Completed])
            .due_after(7)
            .priority(Priority::Medium)
            .title("Concrete curing check")
            .description("Verify curing and strength before loading the element")
            .required("Curing method applied and logged")
            .required("Cylinder test results recorded")
            .build(),
        QaRuleBuilder::new("steel_connections", "Steel")
            .on_status([InProgress])
            .min_progress(50)
            .priority(Priority::High)
            .title("Structural steel connection inspection")
            .description("Bolted and welded connections checked once erection is half done")
            .required("Bolt torque verified on sampled connections")
            .required("Weld visual inspection recorded")
            .optional("Progress photos uploaded")
            .build(),
        QaRuleBuilder::new("steel_delivery", "Steel")
            .before_start(3)
            .priority(Priority::Medium)
            .title("Steel delivery inspection")
            .description("Check delivered members against the fabrication schedule")
            .required("Mill certificates received")
            .required("Member marks match erection drawings")
            .build(),
        QaRuleBuilder::new("foundation_excavation", "Foundation")
            .before_start(3)
            .priority(Priority::High)
            .title("Excavation readiness")
            .description("Ground conditions and services must be confirmed before digging")
            .required("Underground services located and marked")
            .required("Soil bearing report received")
            .required("Excavation permit on site")
            .build(),
        QaRuleBuilder::new("foundation_signoff", "Foundation")
            .on_status([Completed])
            .due_after(1)
            .priority(Priority::High)
            .title("Foundation sign-off")
            .description("Engineer approval before building on the foundation")
            .required("As-built survey completed")
            .required("Structural engineer sign-off obtained")
            .optional("Backfill approval recorded")
            .build(),
        QaRuleBuilder::new("electrical_rough_in", "Electrical")
            .on_status([InProgress])
            .min_progress(80)
            .priority(Priority::High)
            .title("Electrical rough-in inspection")
            .description("Rough-in must be inspected before walls are closed")
            .required("Cable routing and support checked")
            .required("Box fill and grounding verified")
            .build(),
        QaRuleBuilder::new("delay_review", "Concrete")
            .on_status([Delayed])
            .priority(Priority::Medium)
            .title("Delayed pour review")
            .description("Check that materials on site are still within spec after the delay")
            .required("Stored materials checked for damage or expiry")
            .optional("Revised pour date agreed with supplier")
            .build(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_builder_status_rule() {
        let rule = QaRuleBuilder::new("k", "Steel")
            .on_status([TaskStatus::InProgress])
            .min_progress(40)
            .due_after(2)
            .priority(Priority::High)
            .title("T")
            .required("a")
            .optional("b")
            .build();

        assert_eq!(
            rule.trigger,
            Trigger::StatusTransition {
                into: vec![TaskStatus::InProgress],
                min_progress: Some(40),
                due_offset_days: 2,
            }
        );
        assert_eq!(rule.trigger.kind(), RuleKind::StatusTransition);
        assert_eq!(rule.checklist.len(), 2);
        assert!(rule.checklist[0].required);
        assert!(!rule.checklist[1].required);
    }

    #[test]
    fn test_min_progress_ignored_for_proximity_rules() {
        let rule = QaRuleBuilder::new("k", "Steel").before_start(3).min_progress(40).build();
        assert_eq!(rule.trigger, Trigger::ScheduleProximity { days_before: 3 });
    }

    #[test]
    fn test_builtin_keys_are_unique() {
        let rules = builtin_rules();
        let keys: HashSet<&str> = rules.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys.len(), rules.len());
    }

    #[test]
    fn test_concrete_pre_pour_shape() {
        let rules = builtin_rules();
        let rule = rules.iter().find(|r| r.key == "concrete_pre_pour").unwrap();
        assert_eq!(rule.priority, Priority::Critical);
        assert_eq!(rule.checklist.iter().filter(|i| i.required).count(), 3);
    }

    #[test]
    fn test_instantiate_checklist_gets_fresh_ids() {
        let rules = builtin_rules();
        let a = rules[0].instantiate_checklist();
        let b = rules[0].instantiate_checklist();
        assert_eq!(a.len(), b.len());
        assert_ne!(a[0].id, b[0].id);
        assert!(a.iter().all(|i| !i.completed));
    }
}
