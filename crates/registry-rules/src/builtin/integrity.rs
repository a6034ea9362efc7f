use std::collections::{BTreeSet, HashSet};
use std::str::FromStr;

use registry_storage::RuleType;

use crate::context::RuleContext;
use crate::error::{RulesError, RulesResult};
use crate::executor::{RuleExecutor, RuleOutcome, RuleViolationCause};

/// One check an INTEGRITY rule can enable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IntegrityCheck {
    /// Declared reference names are unique.
    NoDuplicates,
    /// Every declared reference has resolved content.
    RefsExist,
}

impl IntegrityCheck {
    pub const ALL: [IntegrityCheck; 2] = [IntegrityCheck::NoDuplicates, IntegrityCheck::RefsExist];

    /// Parse a comma-separated configuration such as `NO_DUPLICATES,REFS_EXIST`.
    ///
    /// `NONE` contributes nothing and `FULL` enables every check.
    pub fn parse_set(configuration: &str) -> RulesResult<BTreeSet<IntegrityCheck>> {
        let mut checks = BTreeSet::new();
        for item in configuration.split(',') {
            match item.trim().to_ascii_uppercase().as_str() {
                "NONE" => {}
                "FULL" => checks.extend(IntegrityCheck::ALL),
                other => {
                    let check = IntegrityCheck::from_str(other).map_err(|_| {
                        RulesError::InvalidConfig {
                            rule_type: RuleType::Integrity,
                            configuration: configuration.to_string(),
                        }
                    })?;
                    checks.insert(check);
                }
            }
        }
        Ok(checks)
    }
}

impl FromStr for IntegrityCheck {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NO_DUPLICATES" => Ok(IntegrityCheck::NoDuplicates),
            "REFS_EXIST" => Ok(IntegrityCheck::RefsExist),
            _ => Err(()),
        }
    }
}

/// INTEGRITY: checks on the references declared with the updated content.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegrityRuleExecutor;

impl RuleExecutor for IntegrityRuleExecutor {
    fn execute(&self, ctx: &RuleContext<'_>) -> RulesResult<RuleOutcome> {
        let checks = IntegrityCheck::parse_set(ctx.configuration.as_str())?;
        let mut causes = Vec::new();

        if checks.contains(&IntegrityCheck::NoDuplicates) {
            let mut seen = HashSet::new();
            for reference in ctx.references {
                if !seen.insert(reference.name.as_str()) {
                    causes.push(RuleViolationCause::new(
                        "duplicate reference name",
                        reference.name.clone(),
                    ));
                }
            }
        }

        if checks.contains(&IntegrityCheck::RefsExist) {
            // Absence is the rule's business here, not a contract error.
            for reference in ctx.references {
                if !ctx.resolved_references.contains_key(&reference.name) {
                    causes.push(RuleViolationCause::new(
                        format!("reference to {} does not exist", reference.artifact_id),
                        reference.name.clone(),
                    ));
                }
            }
        }

        if causes.is_empty() {
            Ok(RuleOutcome::Satisfied)
        } else {
            Ok(ctx.violation_with_causes("artifact references are not valid", causes))
        }
    }
}
