//! Evaluation context handed to rule executors.

use std::collections::HashMap;

use registry_storage::{ArtifactReference, ContentHandle, RuleConfiguration, RuleType};

use crate::error::{RulesError, RulesResult};
use crate::executor::{RuleOutcome, RuleViolation, RuleViolationCause};
use crate::lazy_content::LazyContentList;

/// Prior content an executor compares the candidate against.
#[derive(Debug)]
pub enum ContentHistory<'s> {
    /// Enabled versions of the artifact, fetched on demand.
    Lazy(LazyContentList<'s>),
    /// Content already in memory (e.g. one specific stored version).
    Materialized(Vec<ContentHandle>),
}

impl ContentHistory<'_> {
    pub fn empty() -> Self {
        ContentHistory::Materialized(Vec::new())
    }

    pub fn len(&self) -> usize {
        match self {
            ContentHistory::Lazy(list) => list.len(),
            ContentHistory::Materialized(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Content at `index` (oldest first).
    pub fn get(&self, index: usize) -> RulesResult<ContentHandle> {
        match self {
            ContentHistory::Lazy(list) => list.get(index),
            ContentHistory::Materialized(items) => {
                items
                    .get(index)
                    .cloned()
                    .ok_or(RulesError::HistoryIndexOutOfRange {
                        index,
                        len: items.len(),
                    })
            }
        }
    }

    /// Newest content, if any.
    pub fn last(&self) -> Option<RulesResult<ContentHandle>> {
        self.len().checked_sub(1).map(|index| self.get(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = RulesResult<ContentHandle>> + '_ {
        (0..self.len()).map(move |index| self.get(index))
    }
}

/// Everything an executor needs to evaluate one rule.
///
/// Built by the engine per rule and borrowed immutably for the duration of
/// the evaluation.
#[derive(Debug)]
pub struct RuleContext<'a> {
    pub group_id: &'a str,
    pub artifact_id: &'a str,
    /// Artifact type tag (e.g. `JSON`)
    pub artifact_type: &'a str,
    pub rule_type: RuleType,
    pub configuration: &'a RuleConfiguration,
    /// Prior content, oldest first; empty when there is nothing to compare
    pub current_content: &'a ContentHistory<'a>,
    /// The proposed new content
    pub updated_content: &'a ContentHandle,
    pub references: &'a [ArtifactReference],
    pub resolved_references: &'a HashMap<String, ContentHandle>,
}

impl<'a> RuleContext<'a> {
    /// Resolved content for the reference called `name`.
    ///
    /// A declared reference without resolved content means the caller did not
    /// hold up its end; this is an error, not a violation.
    pub fn resolved_reference(&self, name: &str) -> RulesResult<&'a ContentHandle> {
        self.resolved_references
            .get(name)
            .ok_or_else(|| RulesError::UnresolvedReference {
                name: name.to_string(),
            })
    }

    /// Violation of this context's rule.
    pub fn violation(&self, reason: impl Into<String>) -> RuleOutcome {
        RuleOutcome::Violated(RuleViolation::new(self.rule_type, reason))
    }

    /// Violation of this context's rule with detailed causes.
    pub fn violation_with_causes(
        &self,
        reason: impl Into<String>,
        causes: Vec<RuleViolationCause>,
    ) -> RuleOutcome {
        RuleOutcome::Violated(RuleViolation::new(self.rule_type, reason).with_causes(causes))
    }
}
