//! Error taxonomy for the rules engine.
//!
//! Rule violations are not errors: executors report them as
//! [`RuleOutcome::Violated`](crate::RuleOutcome::Violated). Everything here
//! aborts the call without a verdict.

use registry_storage::{RuleType, StorageError};

/// Rules engine errors.
#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("no executor registered for rule {0}")]
    NoExecutor(RuleType),

    #[error("unknown artifact type: {0}")]
    UnknownArtifactType(String),

    #[error("reference '{name}' has no resolved content")]
    UnresolvedReference { name: String },

    #[error("content history index {index} out of range (len {len})")]
    HistoryIndexOutOfRange { index: usize, len: usize },

    #[error("failed to canonicalize {artifact_type} content: {reason}")]
    Canonicalization {
        artifact_type: String,
        reason: String,
    },

    #[error("invalid configuration '{configuration}' for rule {rule_type}")]
    InvalidConfig {
        rule_type: RuleType,
        configuration: String,
    },
}

/// Result type for rules engine operations.
pub type RulesResult<T> = std::result::Result<T, RulesError>;
