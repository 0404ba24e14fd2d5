//! Per-category visiting policy.
//!
//! Replaces per-type conditional branching with a rule lookup: each tracked
//! object reports a canonical category key, and the policy decides whether
//! that category is visited on a given firing. A category can also be visited
//! less often than the sweep fires via its interval multiplier.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Visiting rule for one object category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryRule {
    /// Whether objects in this category are visited at all.
    pub enabled: bool,
    /// Visit the category on every Nth firing (1 = every firing, must be >= 1).
    pub interval_multiplier: u64,
}

impl Default for CategoryRule {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_multiplier: 1,
        }
    }
}

impl CategoryRule {
    /// Check invariants, naming the category on failure.
    pub fn validate(&self, category: &str) -> Result<(), ConfigError> {
        if self.interval_multiplier == 0 {
            return Err(ConfigError::ZeroIntervalMultiplier {
                category: category.to_string(),
            });
        }
        Ok(())
    }
}

/// Category-to-rule mapping with a default rule for unlisted categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct VisitorPolicy {
    default_rule: CategoryRule,
    rules: BTreeMap<String, CategoryRule>,
}

impl VisitorPolicy {
    /// Policy that visits every category on every firing.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Build a policy from explicit rules plus a default for the rest.
    pub fn with_rules(default_rule: CategoryRule, rules: BTreeMap<String, CategoryRule>) -> Self {
        Self {
            default_rule,
            rules,
        }
    }

    /// Set or replace the rule for one category.
    pub fn set_rule(&mut self, category: impl Into<String>, rule: CategoryRule) {
        self.rules.insert(category.into(), rule);
    }

    /// Look up the rule governing `category`.
    pub fn rule(&self, category: &str) -> CategoryRule {
        self.rules.get(category).copied().unwrap_or(self.default_rule)
    }

    /// The rule applied to categories without an explicit entry.
    pub fn default_rule(&self) -> CategoryRule {
        self.default_rule
    }

    /// Iterate explicitly configured categories and their rules.
    pub fn rules(&self) -> impl Iterator<Item = (&str, &CategoryRule)> {
        self.rules.iter().map(|(category, rule)| (category.as_str(), rule))
    }

    /// Whether `category` is visited on the firing with index `firing_index`.
    ///
    /// A multiplier of N selects firings 0, N, 2N, and so on. Firing indices
    /// count completed firings only; gate-skipped attempts do not consume one.
    pub fn eligible(&self, category: &str, firing_index: u64) -> bool {
        let rule = self.rule(category);
        rule.enabled && firing_index % rule.interval_multiplier == 0
    }

    /// Check every rule, including the default.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.default_rule.validate("default")?;
        for (category, rule) in &self.rules {
            rule.validate(category)?;
        }
        Ok(())
    }
}
