//! Rule registry - QA rules indexed by task category.

use std::collections::HashMap;

use crate::rules::{builtin_rules, QaRule};

/// Registry for QA rules.
///
/// Categories are matched case-insensitively with surrounding whitespace
/// ignored, so "concrete " and "Concrete" select the same rules. Unknown
/// categories simply select nothing.
#[derive(Debug, Clone)]
pub struct RuleRegistry {
    rules: Vec<QaRule>,
    by_category: HashMap<String, Vec<usize>>,
}

impl RuleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            by_category: HashMap::new(),
        }
    }

    /// Registry holding the built-in table.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for rule in builtin_rules() {
            // builtin keys are unique
            let _ = registry.register(rule);
        }
        registry
    }

    /// Register a rule.
    pub fn register(&mut self, rule: QaRule) -> Result<(), String> {
        if rule.key.trim().is_empty() {
            return Err("Rule key cannot be empty".to_string());
        }
        if self.rules.iter().any(|r| r.key == rule.key) {
            return Err(format!("Rule '{}' is already registered", rule.key));
        }

        let index = self.rules.len();
        self.by_category
            .entry(normalize(&rule.category))
            .or_default()
            .push(index);
        self.rules.push(rule);
        Ok(())
    }

    /// Get a rule by key.
    pub fn get(&self, key: &str) -> Option<&QaRule> {
        self.rules.iter().find(|r| r.key == key)
    }

    /// List all rules in registration order.
    pub fn list(&self) -> &[QaRule] {
        &self.rules
    }

    /// Find rules for a task category.
    pub fn find_by_category(&self, category: &str) -> Vec<&QaRule> {
        self.by_category
            .get(&normalize(category))
            .into_iter()
            .flat_map(|ids| ids.iter().filter_map(|i| self.rules.get(*i)))
            .collect()
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn normalize(category: &str) -> String {
    category.trim().to_lowercase()
}
