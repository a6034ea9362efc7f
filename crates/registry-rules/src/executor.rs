//! Pluggable rule executors and the registry that dispatches to them.
//!
//! Each [`RuleType`] maps to exactly one [`RuleExecutor`]. The engine only
//! builds the [`RuleContext`] and reads back a [`RuleOutcome`]; it knows
//! nothing about what an executor checks. New rule kinds are added by
//! registering another executor, not by touching the engine.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use registry_storage::RuleType;

use crate::context::RuleContext;
use crate::error::{RulesError, RulesResult};

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Detail attached to a violation (e.g. which path or reference failed).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleViolationCause {
    /// Human-readable description.
    pub description: String,
    /// Where in the content the problem is (path, reference name, ...).
    pub context: String,
}

impl RuleViolationCause {
    pub fn new(description: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            context: context.into(),
        }
    }
}

/// A failed rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleViolation {
    /// Which rule was violated.
    pub rule_type: RuleType,
    /// Human-readable explanation.
    pub reason: String,
    /// Optional detail, in the order the executor found it.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<RuleViolationCause>,
}

impl RuleViolation {
    pub fn new(rule_type: RuleType, reason: impl Into<String>) -> Self {
        Self {
            rule_type,
            reason: reason.into(),
            causes: Vec::new(),
        }
    }

    pub fn with_causes(mut self, causes: Vec<RuleViolationCause>) -> Self {
        self.causes = causes;
        self
    }
}

impl fmt::Display for RuleViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} rule violated: {}", self.rule_type, self.reason)?;
        for cause in &self.causes {
            write!(f, "\n  - {} ({})", cause.description, cause.context)?;
        }
        Ok(())
    }
}

/// Result of evaluating a rule (or a whole rule set).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    Satisfied,
    Violated(RuleViolation),
}

impl RuleOutcome {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, RuleOutcome::Satisfied)
    }

    pub fn violation(&self) -> Option<&RuleViolation> {
        match self {
            RuleOutcome::Satisfied => None,
            RuleOutcome::Violated(v) => Some(v),
        }
    }

    pub fn into_violation(self) -> Option<RuleViolation> {
        match self {
            RuleOutcome::Satisfied => None,
            RuleOutcome::Violated(v) => Some(v),
        }
    }
}

// ---------------------------------------------------------------------------
// Executor trait
// ---------------------------------------------------------------------------

/// Checks one rule against a context.
///
/// Return `Ok(RuleOutcome::Violated(..))` when the content breaks the rule and
/// `Err(..)` only when the check itself could not be carried out.
pub trait RuleExecutor: Send + Sync {
    fn execute(&self, context: &RuleContext<'_>) -> RulesResult<RuleOutcome>;
}

impl<F> RuleExecutor for F
where
    F: Fn(&RuleContext<'_>) -> RulesResult<RuleOutcome> + Send + Sync,
{
    fn execute(&self, context: &RuleContext<'_>) -> RulesResult<RuleOutcome> {
        self(context)
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Maps each rule type to its executor.
#[derive(Default, Clone)]
pub struct RuleExecutorRegistry {
    executors: BTreeMap<RuleType, Arc<dyn RuleExecutor>>,
}

impl RuleExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the executor for `rule_type`.
    pub fn register(&mut self, rule_type: RuleType, executor: Arc<dyn RuleExecutor>) {
        self.executors.insert(rule_type, executor);
    }

    /// Builder form of [`register`](Self::register).
    pub fn with_executor(mut self, rule_type: RuleType, executor: Arc<dyn RuleExecutor>) -> Self {
        self.register(rule_type, executor);
        self
    }

    /// Executor for `rule_type`, or [`RulesError::NoExecutor`].
    pub fn executor_for(&self, rule_type: RuleType) -> RulesResult<&dyn RuleExecutor> {
        self.executors
            .get(&rule_type)
            .map(|e| e.as_ref())
            .ok_or(RulesError::NoExecutor(rule_type))
    }

    pub fn contains(&self, rule_type: RuleType) -> bool {
        self.executors.contains_key(&rule_type)
    }

    pub fn rule_types(&self) -> impl Iterator<Item = RuleType> + '_ {
        self.executors.keys().copied()
    }
}

impl fmt::Debug for RuleExecutorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleExecutorRegistry")
            .field("rule_types", &self.executors.keys().collect::<Vec<_>>())
            .finish()
    }
}
