//! Effective rule set resolution.
//!
//! Rules come from three tiers:
//! 1. **Artifact** rules configured on the artifact itself.
//! 2. **Global** rules configured registry-wide.
//! 3. **Default** global rules built into the deployment (see
//!    [`RulesProperties`](crate::RulesProperties)).
//!
//! A non-empty artifact tier wins outright and the other two are never
//! consulted. Otherwise global and default rules are combined, with an
//! explicit global rule always shadowing the default of the same type.

use std::collections::btree_map::{self, Entry};
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use registry_storage::{RuleConfiguration, RuleType};

/// Source of the built-in default global rules.
pub trait DefaultRuleProvider: Send + Sync {
    /// Rule types that have a default and are not in `existing_global`.
    fn filtered_default_kinds(&self, existing_global: &[RuleType]) -> Vec<RuleType>;

    /// Default configuration for `rule_type`, if one is defined.
    fn default_config(&self, rule_type: RuleType) -> Option<RuleConfiguration>;
}

/// Which tier produced a resolved rule set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleTier {
    Artifact,
    GlobalAndDefault,
}

impl RuleTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleTier::Artifact => "artifact",
            RuleTier::GlobalAndDefault => "global",
        }
    }
}

/// The effective rule type → configuration mapping for one artifact.
///
/// Iteration follows [`RuleType`] declaration order, so the first violation
/// reported for a given input is stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRules {
    tier: RuleTier,
    rules: BTreeMap<RuleType, RuleConfiguration>,
}

impl ResolvedRules {
    pub fn tier(&self) -> RuleTier {
        self.tier
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn get(&self, rule_type: RuleType) -> Option<&RuleConfiguration> {
        self.rules.get(&rule_type)
    }

    pub fn rule_types(&self) -> impl Iterator<Item = RuleType> + '_ {
        self.rules.keys().copied()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, RuleType, RuleConfiguration> {
        self.rules.iter()
    }
}

impl<'a> IntoIterator for &'a ResolvedRules {
    type Item = (&'a RuleType, &'a RuleConfiguration);
    type IntoIter = btree_map::Iter<'a, RuleType, RuleConfiguration>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

/// Resolve the effective rules from the three tiers.
///
/// * `artifact_kinds` / `artifact_config`: the artifact tier.
/// * `global_kinds` / `global_config`: the global tier. `global_kinds` is
///   only called when the artifact tier is empty.
/// * `default_filter` / `default_config`: the default tier. The filter
///   receives the global kinds and must leave those out.
///
/// Lookup failures abort resolution and are returned unchanged.
pub fn resolve_rules<E, A, K, G, F, D>(
    artifact_kinds: Vec<RuleType>,
    mut artifact_config: A,
    global_kinds: K,
    mut global_config: G,
    default_filter: F,
    mut default_config: D,
) -> Result<ResolvedRules, E>
where
    A: FnMut(RuleType) -> Result<RuleConfiguration, E>,
    K: FnOnce() -> Result<Vec<RuleType>, E>,
    G: FnMut(RuleType) -> Result<RuleConfiguration, E>,
    F: FnOnce(&[RuleType]) -> Vec<RuleType>,
    D: FnMut(RuleType) -> Option<RuleConfiguration>,
{
    if !artifact_kinds.is_empty() {
        let mut rules = BTreeMap::new();
        for kind in artifact_kinds {
            rules.insert(kind, artifact_config(kind)?);
        }
        return Ok(ResolvedRules {
            tier: RuleTier::Artifact,
            rules,
        });
    }

    let global_kinds = global_kinds()?;
    let mut rules = BTreeMap::new();
    for &kind in &global_kinds {
        rules.insert(kind, global_config(kind)?);
    }

    for kind in default_filter(&global_kinds) {
        // Explicit global configuration wins even if the filter let it through.
        if let Entry::Vacant(slot) = rules.entry(kind) {
            if let Some(configuration) = default_config(kind) {
                slot.insert(configuration);
            }
        }
    }

    Ok(ResolvedRules {
        tier: RuleTier::GlobalAndDefault,
        rules,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    type Never = std::convert::Infallible;

    fn cfg(s: &str) -> RuleConfiguration {
        RuleConfiguration::new(s)
    }

    #[test]
    fn artifact_tier_short_circuits() {
        let global_listed = Cell::new(false);
        let resolved = resolve_rules::<Never, _, _, _, _, _>(
            vec![RuleType::Validity],
            |_| Ok(cfg("FULL")),
            || {
                global_listed.set(true);
                Ok(vec![RuleType::Compatibility])
            },
            |_| panic!("global config must not be read"),
            |_| panic!("defaults must not be filtered"),
            |_| panic!("defaults must not be read"),
        )
        .unwrap();

        assert!(!global_listed.get());
        assert_eq!(resolved.tier(), RuleTier::Artifact);
        assert_eq!(resolved.get(RuleType::Validity), Some(&cfg("FULL")));
        assert_eq!(resolved.len(), 1);
    }

    #[test]
    fn global_shadows_default_even_if_filter_leaks() {
        let resolved = resolve_rules::<Never, _, _, _, _, _>(
            Vec::new(),
            |_| unreachable!(),
            || Ok(vec![RuleType::Compatibility]),
            |_| Ok(cfg("FORWARD")),
            |_| vec![RuleType::Compatibility, RuleType::Validity],
            |kind| match kind {
                RuleType::Compatibility => Some(cfg("BACKWARD")),
                RuleType::Validity => Some(cfg("SYNTAX_ONLY")),
                RuleType::Integrity => None,
            },
        )
        .unwrap();

        assert_eq!(resolved.tier(), RuleTier::GlobalAndDefault);
        assert_eq!(resolved.get(RuleType::Compatibility), Some(&cfg("FORWARD")));
        assert_eq!(resolved.get(RuleType::Validity), Some(&cfg("SYNTAX_ONLY")));
    }

    #[test]
    fn default_without_config_is_skipped() {
        let resolved = resolve_rules::<Never, _, _, _, _, _>(
            Vec::new(),
            |_| unreachable!(),
            || Ok(Vec::new()),
            |_| unreachable!(),
            |_| vec![RuleType::Integrity],
            |_| None,
        )
        .unwrap();
        assert!(resolved.is_empty());
    }

    #[test]
    fn lookup_error_aborts() {
        let err = resolve_rules(
            Vec::new(),
            |_| unreachable!(),
            || Ok(vec![RuleType::Validity]),
            |_| Err("backend down"),
            |_| Vec::new(),
            |_| None,
        )
        .unwrap_err();
        assert_eq!(err, "backend down");
    }

    #[test]
    fn iteration_follows_declaration_order() {
        let resolved = resolve_rules::<Never, _, _, _, _, _>(
            vec![
                RuleType::Integrity,
                RuleType::Compatibility,
                RuleType::Validity,
            ],
            |kind| Ok(cfg(kind.as_str())),
            || unreachable!(),
            |_| unreachable!(),
            |_| unreachable!(),
            |_| unreachable!(),
        )
        .unwrap();
        assert_eq!(
            resolved.rule_types().collect::<Vec<_>>(),
            RuleType::ALL.to_vec()
        );
    }
}
