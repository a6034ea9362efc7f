use std::sync::Arc;

use crate::artifact_types::{ArtifactTypeRegistry, ValidityLevel};
use crate::context::RuleContext;
use crate::error::RulesResult;
use crate::executor::{RuleExecutor, RuleOutcome};

/// VALIDITY: `NONE`, `SYNTAX_ONLY` or `FULL`, checked by the artifact type's
/// validator against the updated content.
#[derive(Debug, Clone)]
pub struct ValidityRuleExecutor {
    artifact_types: Arc<ArtifactTypeRegistry>,
}

impl ValidityRuleExecutor {
    pub fn new(artifact_types: Arc<ArtifactTypeRegistry>) -> Self {
        Self { artifact_types }
    }
}

impl RuleExecutor for ValidityRuleExecutor {
    fn execute(&self, ctx: &RuleContext<'_>) -> RulesResult<RuleOutcome> {
        let level: ValidityLevel = ctx.configuration.as_str().parse()?;
        if level == ValidityLevel::None {
            return Ok(RuleOutcome::Satisfied);
        }

        let provider = self.artifact_types.provider_for(ctx.artifact_type)?;
        let causes =
            provider
                .validator()
                .validate(level, ctx.updated_content, ctx.resolved_references)?;

        if causes.is_empty() {
            Ok(RuleOutcome::Satisfied)
        } else {
            Ok(ctx.violation_with_causes(
                format!("{} content is not valid", ctx.artifact_type),
                causes,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use registry_storage::{ContentHandle, RuleConfiguration, RuleType};

    use crate::context::ContentHistory;
    use crate::error::RulesError;

    fn run(artifact_type: &str, config: &str, content: &str) -> RulesResult<RuleOutcome> {
        let executor = ValidityRuleExecutor::new(Arc::new(ArtifactTypeRegistry::with_builtin()));
        let history = ContentHistory::empty();
        let configuration = RuleConfiguration::new(config);
        let updated = ContentHandle::from(content);
        let resolved = HashMap::new();
        let ctx = RuleContext {
            group_id: "g",
            artifact_id: "a",
            artifact_type,
            rule_type: RuleType::Validity,
            configuration: &configuration,
            current_content: &history,
            updated_content: &updated,
            references: &[],
            resolved_references: &resolved,
        };
        executor.execute(&ctx)
    }

    #[test]
    fn none_accepts_anything_even_unknown_types() {
        assert!(run("AVRO", "NONE", "garbage").unwrap().is_satisfied());
    }

    #[test]
    fn syntax_only_rejects_unparseable_json() {
        let outcome = run("JSON", "SYNTAX_ONLY", "{\"a\":").unwrap();
        let violation = outcome.violation().unwrap();
        assert_eq!(violation.rule_type, RuleType::Validity);
        assert_eq!(violation.causes.len(), 1);
    }

    #[test]
    fn full_requires_object() {
        assert!(!run("JSON", "FULL", "[]").unwrap().is_satisfied());
        assert!(run("json", "FULL", "{\"type\":\"object\"}")
            .unwrap()
            .is_satisfied());
    }

    #[test]
    fn unknown_level_is_config_error() {
        assert!(matches!(
            run("JSON", "STRICT", "{}"),
            Err(RulesError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn unknown_type_is_error_when_checking() {
        assert!(matches!(
            run("AVRO", "FULL", "{}"),
            Err(RulesError::UnknownArtifactType(_))
        ));
    }
}
