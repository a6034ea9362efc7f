//! Rule execution engine.
//!
//! [`RulesService`] resolves which rules apply to a candidate, builds one
//! [`RuleContext`] per rule and dispatches to the executor registered for
//! that rule type. Rules run in [`RuleType`] declaration order and the first
//! violation ends the call.
//!
//! History modes:
//!
//! | entry point | prior content |
//! |---|---|
//! | [`apply_rules`](RulesService::apply_rules), update | enabled versions, fetched lazily |
//! | [`apply_rules`](RulesService::apply_rules), create | none |
//! | [`apply_rules_for_version`](RulesService::apply_rules_for_version) | one stored version |
//! | [`apply_rules_compat`](RulesService::apply_rules_compat) | one stored version, canonicalized |
//!
//! Only the stored content is canonicalized in compat mode; the candidate is
//! passed to executors exactly as submitted.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use registry_storage::{
    ArtifactReference, ContentHandle, RegistryStorage, RuleConfiguration, RuleType,
};

use crate::artifact_types::ArtifactTypeRegistry;
use crate::context::{ContentHistory, RuleContext};
use crate::error::RulesResult;
use crate::executor::{RuleExecutorRegistry, RuleOutcome};
use crate::lazy_content::LazyContentList;
use crate::obs;
use crate::resolver::{self, DefaultRuleProvider, ResolvedRules};

/// Whether the candidate creates a new artifact or updates an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleApplicationType {
    /// The artifact does not exist yet: no artifact rules, no history.
    Create,
    /// The artifact exists: artifact rules apply, enabled versions are history.
    Update,
}

impl RuleApplicationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleApplicationType::Create => "create",
            RuleApplicationType::Update => "update",
        }
    }
}

impl fmt::Display for RuleApplicationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleApplicationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create" => Ok(RuleApplicationType::Create),
            "update" => Ok(RuleApplicationType::Update),
            other => Err(format!("unknown rule application type: {}", other)),
        }
    }
}

/// A candidate submitted for rule checking.
#[derive(Debug, Clone)]
pub struct RuleRequest {
    pub group_id: String,
    pub artifact_id: String,
    /// Artifact type tag (e.g. `JSON`)
    pub artifact_type: String,
    /// The proposed new content
    pub content: ContentHandle,
    pub references: Vec<ArtifactReference>,
    /// Reference name → content, resolved by the caller
    pub resolved_references: HashMap<String, ContentHandle>,
}

impl RuleRequest {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        artifact_type: impl Into<String>,
        content: impl Into<ContentHandle>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            artifact_type: artifact_type.into(),
            content: content.into(),
            references: Vec::new(),
            resolved_references: HashMap::new(),
        }
    }

    pub fn with_references(
        mut self,
        references: Vec<ArtifactReference>,
        resolved_references: HashMap<String, ContentHandle>,
    ) -> Self {
        self.references = references;
        self.resolved_references = resolved_references;
        self
    }
}

/// Applies configured rules to candidate content.
///
/// Holds no per-call state: every call builds its own history and contexts,
/// so one service can be shared across threads behind an `Arc`.
#[derive(Clone)]
pub struct RulesService {
    storage: Arc<dyn RegistryStorage>,
    executors: Arc<RuleExecutorRegistry>,
    defaults: Arc<dyn DefaultRuleProvider>,
    artifact_types: Arc<ArtifactTypeRegistry>,
}

impl RulesService {
    pub fn new(
        storage: Arc<dyn RegistryStorage>,
        executors: Arc<RuleExecutorRegistry>,
        defaults: Arc<dyn DefaultRuleProvider>,
        artifact_types: Arc<ArtifactTypeRegistry>,
    ) -> Self {
        Self {
            storage,
            executors,
            defaults,
            artifact_types,
        }
    }

    /// Service with the built-in artifact types and executors.
    pub fn with_builtin(
        storage: Arc<dyn RegistryStorage>,
        defaults: Arc<dyn DefaultRuleProvider>,
    ) -> Self {
        let artifact_types = Arc::new(ArtifactTypeRegistry::with_builtin());
        let executors = Arc::new(RuleExecutorRegistry::with_builtin(artifact_types.clone()));
        Self::new(storage, executors, defaults, artifact_types)
    }

    /// The rules that would apply to `group_id/artifact_id`.
    ///
    /// In create mode the artifact tier is not read.
    #[instrument(skip(self), fields(mode = %application_type))]
    pub fn resolve_rules(
        &self,
        group_id: &str,
        artifact_id: &str,
        application_type: RuleApplicationType,
    ) -> RulesResult<ResolvedRules> {
        let artifact_kinds = match application_type {
            RuleApplicationType::Create => Vec::new(),
            RuleApplicationType::Update => self.storage.artifact_rules(group_id, artifact_id)?,
        };
        self.resolve_with(group_id, artifact_id, artifact_kinds)
    }

    /// Apply every effective rule to `request`.
    ///
    /// Returns the first violation, or `Satisfied` when all rules pass or
    /// none apply.
    #[instrument(
        skip(self, request),
        fields(group_id = %request.group_id, artifact_id = %request.artifact_id, mode = %application_type)
    )]
    pub fn apply_rules(
        &self,
        request: &RuleRequest,
        application_type: RuleApplicationType,
    ) -> RulesResult<RuleOutcome> {
        let rules = self.resolve_rules(&request.group_id, &request.artifact_id, application_type)?;
        if rules.is_empty() {
            return Ok(RuleOutcome::Satisfied);
        }
        let history = self.history(request, application_type)?;
        self.evaluate(request, &rules, &history)
    }

    /// Apply one explicitly given rule, skipping resolution.
    #[instrument(
        skip(self, request, configuration),
        fields(group_id = %request.group_id, artifact_id = %request.artifact_id, mode = %application_type)
    )]
    pub fn apply_rule(
        &self,
        request: &RuleRequest,
        rule_type: RuleType,
        configuration: &RuleConfiguration,
        application_type: RuleApplicationType,
    ) -> RulesResult<RuleOutcome> {
        let history = self.history(request, application_type)?;
        self.evaluate_one(request, rule_type, configuration, &history)
    }

    /// Apply the effective rules, comparing against one stored version.
    #[instrument(
        skip(self, request),
        fields(group_id = %request.group_id, artifact_id = %request.artifact_id)
    )]
    pub fn apply_rules_for_version(
        &self,
        request: &RuleRequest,
        version: &str,
    ) -> RulesResult<RuleOutcome> {
        let stored =
            self.storage
                .artifact_version(&request.group_id, &request.artifact_id, version)?;
        let history = ContentHistory::Materialized(vec![stored.content]);
        self.apply_with_history(request, &history)
    }

    /// Like [`apply_rules_for_version`](Self::apply_rules_for_version), but the
    /// stored content is canonicalized first (with no references). The
    /// candidate content is left as submitted.
    #[instrument(
        skip(self, request),
        fields(group_id = %request.group_id, artifact_id = %request.artifact_id)
    )]
    pub fn apply_rules_compat(
        &self,
        request: &RuleRequest,
        version: &str,
    ) -> RulesResult<RuleOutcome> {
        let provider = self.artifact_types.provider_for(&request.artifact_type)?;
        let stored =
            self.storage
                .artifact_version(&request.group_id, &request.artifact_id, version)?;
        let canonical = provider
            .canonicalizer()
            .canonicalize(&stored.content, &HashMap::new())?;
        let history = ContentHistory::Materialized(vec![canonical]);
        self.apply_with_history(request, &history)
    }

    fn apply_with_history(
        &self,
        request: &RuleRequest,
        history: &ContentHistory<'_>,
    ) -> RulesResult<RuleOutcome> {
        let artifact_kinds = self
            .storage
            .artifact_rules(&request.group_id, &request.artifact_id)?;
        let rules = self.resolve_with(&request.group_id, &request.artifact_id, artifact_kinds)?;
        self.evaluate(request, &rules, history)
    }

    fn resolve_with(
        &self,
        group_id: &str,
        artifact_id: &str,
        artifact_kinds: Vec<RuleType>,
    ) -> RulesResult<ResolvedRules> {
        let storage = self.storage.as_ref();
        let defaults = self.defaults.as_ref();
        let rules = resolver::resolve_rules(
            artifact_kinds,
            |kind| storage.artifact_rule(group_id, artifact_id, kind),
            || storage.global_rules(),
            |kind| storage.global_rule(kind),
            |global| defaults.filtered_default_kinds(global),
            |kind| defaults.default_config(kind),
        )?;
        obs::emit_rules_resolved(rules.tier(), rules.len());
        Ok(rules)
    }

    fn history(
        &self,
        request: &RuleRequest,
        application_type: RuleApplicationType,
    ) -> RulesResult<ContentHistory<'_>> {
        match application_type {
            RuleApplicationType::Create => Ok(ContentHistory::empty()),
            RuleApplicationType::Update => {
                let content_ids = self
                    .storage
                    .enabled_content_ids(&request.group_id, &request.artifact_id)?;
                Ok(ContentHistory::Lazy(LazyContentList::new(
                    self.storage.as_ref(),
                    content_ids,
                )))
            }
        }
    }

    fn evaluate(
        &self,
        request: &RuleRequest,
        rules: &ResolvedRules,
        history: &ContentHistory<'_>,
    ) -> RulesResult<RuleOutcome> {
        for (&rule_type, configuration) in rules {
            let outcome = self.evaluate_one(request, rule_type, configuration, history)?;
            if !outcome.is_satisfied() {
                return Ok(outcome);
            }
        }
        Ok(RuleOutcome::Satisfied)
    }

    fn evaluate_one(
        &self,
        request: &RuleRequest,
        rule_type: RuleType,
        configuration: &RuleConfiguration,
        history: &ContentHistory<'_>,
    ) -> RulesResult<RuleOutcome> {
        let result = self.executors.executor_for(rule_type).and_then(|executor| {
            let context = RuleContext {
                group_id: &request.group_id,
                artifact_id: &request.artifact_id,
                artifact_type: &request.artifact_type,
                rule_type,
                configuration,
                current_content: history,
                updated_content: &request.content,
                references: &request.references,
                resolved_references: &request.resolved_references,
            };
            executor.execute(&context)
        });

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                obs::emit_rule_error(rule_type, &e);
                return Err(e);
            }
        };

        obs::emit_rule_evaluated(rule_type, outcome.is_satisfied());
        if let Some(violation) = outcome.violation() {
            obs::emit_rule_violated(rule_type, &violation.reason, violation.causes.len());
        }
        Ok(outcome)
    }
}

impl fmt::Debug for RulesService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RulesService")
            .field("executors", &self.executors)
            .field("artifact_types", &self.artifact_types)
            .finish()
    }
}
