//! Default global rule configuration.
//!
//! Defaults apply only to rule types that have no explicit global rule. They
//! are set programmatically, deserialized from a config document, or read
//! from the environment:
//!
//! | variable | rule |
//! |---|---|
//! | `REGISTRY_RULES_GLOBAL_VALIDITY` | VALIDITY |
//! | `REGISTRY_RULES_GLOBAL_COMPATIBILITY` | COMPATIBILITY |
//! | `REGISTRY_RULES_GLOBAL_INTEGRITY` | INTEGRITY |

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use registry_storage::{RuleConfiguration, RuleType};

use crate::resolver::DefaultRuleProvider;

const ENV_PREFIX: &str = "REGISTRY_RULES_GLOBAL_";

/// Built-in default global rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RulesProperties {
    default_global_rules: BTreeMap<RuleType, RuleConfiguration>,
}

impl RulesProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default for `rule_type`.
    pub fn with_default(mut self, rule_type: RuleType, configuration: impl Into<String>) -> Self {
        self.default_global_rules
            .insert(rule_type, RuleConfiguration::new(configuration));
        self
    }

    /// Read defaults from `REGISTRY_RULES_GLOBAL_<TYPE>` variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read defaults through `lookup`, keyed like [`from_env`](Self::from_env).
    /// Blank values are ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut properties = Self::default();
        for rule_type in RuleType::ALL {
            let key = format!("{}{}", ENV_PREFIX, rule_type.as_str());
            if let Some(value) = lookup(&key) {
                let value = value.trim();
                if !value.is_empty() {
                    properties = properties.with_default(rule_type, value);
                }
            }
        }
        properties
    }

    /// Defaults from `overrides` replace those in `self`.
    pub fn merged_with(mut self, overrides: &RulesProperties) -> Self {
        for (rule_type, configuration) in &overrides.default_global_rules {
            self.default_global_rules
                .insert(*rule_type, configuration.clone());
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.default_global_rules.is_empty()
    }

    pub fn defaults(&self) -> &BTreeMap<RuleType, RuleConfiguration> {
        &self.default_global_rules
    }
}

impl DefaultRuleProvider for RulesProperties {
    fn filtered_default_kinds(&self, existing_global: &[RuleType]) -> Vec<RuleType> {
        self.default_global_rules
            .keys()
            .copied()
            .filter(|kind| !existing_global.contains(kind))
            .collect()
    }

    fn default_config(&self, rule_type: RuleType) -> Option<RuleConfiguration> {
        self.default_global_rules.get(&rule_type).cloned()
    }
}
