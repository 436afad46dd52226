//! Quality Assurance layer
//!
//! Static inspection rules, the rule-trigger engine that turns task changes
//! into QA alerts, the checklist state machine that closes them, and the
//! sinks that deliver notifications.

#![warn(missing_docs)]

pub mod error;
pub mod rules;
pub mod registry;
pub mod engine;
pub mod checklist;
pub mod notify;

pub use error::{QualityError, Result};
pub use rules::{QaRule, QaRuleBuilder, Trigger, ChecklistTemplateItem, builtin_rules};
pub use registry::RuleRegistry;
pub use engine::{QaRuleEngine, Evaluation};
pub use checklist::{ChecklistMachine, CompletionOutcome};
pub use notify::{NotificationSink, LogSink, MemorySink, WebhookSink, sink_from_config};
