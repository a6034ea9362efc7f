//! Error types for registry-storage

use thiserror::Error;

use crate::storage_traits::{ContentId, RuleType};

/// Errors that can occur when reading from the registry storage layer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Artifact does not exist
    #[error("Artifact not found: {group_id}/{artifact_id}")]
    ArtifactNotFound {
        group_id: String,
        artifact_id: String,
    },

    /// Artifact exists but the requested version does not
    #[error("Version not found: {group_id}/{artifact_id}@{version}")]
    VersionNotFound {
        group_id: String,
        artifact_id: String,
        version: String,
    },

    /// No content blob stored under the id
    #[error("Content not found: {content_id}")]
    ContentNotFound { content_id: ContentId },

    /// Rule listed but its configuration is missing
    #[error("Rule {rule_type} is not configured for {scope}")]
    RuleNotConfigured { rule_type: RuleType, scope: String },

    /// A persisted column holds a value that cannot be decoded
    #[error("Malformed persisted data in '{field}': {reason}")]
    MalformedData { field: String, reason: String },

    /// Encoding a value for persistence failed
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Backend I/O or query failure
    #[error("Storage backend failure: {0}")]
    Backend(String),
}

/// Returned when a string does not name a known rule type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown rule type: {0}")]
pub struct ParseRuleTypeError(pub String);
