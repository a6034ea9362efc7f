//! Executors shipped with the engine.
//!
//! VALIDITY and INTEGRITY have built-in executors. COMPATIBILITY does not:
//! deployments register their own, and applying a COMPATIBILITY rule without
//! one fails with [`RulesError::NoExecutor`](crate::RulesError::NoExecutor).

mod integrity;
mod validity;

use std::sync::Arc;

use registry_storage::RuleType;

use crate::artifact_types::ArtifactTypeRegistry;
use crate::executor::RuleExecutorRegistry;

pub use integrity::{IntegrityCheck, IntegrityRuleExecutor};
pub use validity::ValidityRuleExecutor;

impl RuleExecutorRegistry {
    /// Registry with the built-in VALIDITY and INTEGRITY executors.
    pub fn with_builtin(artifact_types: Arc<ArtifactTypeRegistry>) -> Self {
        Self::new()
            .with_executor(
                RuleType::Validity,
                Arc::new(ValidityRuleExecutor::new(artifact_types)),
            )
            .with_executor(RuleType::Integrity, Arc::new(IntegrityRuleExecutor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_covers_validity_and_integrity_only() {
        let registry =
            RuleExecutorRegistry::with_builtin(Arc::new(ArtifactTypeRegistry::with_builtin()));
        assert_eq!(
            registry.rule_types().collect::<Vec<_>>(),
            vec![RuleType::Validity, RuleType::Integrity]
        );
        assert!(!registry.contains(RuleType::Compatibility));
    }
}
