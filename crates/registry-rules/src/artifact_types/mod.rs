//! Per-artifact-type content handling.
//!
//! An [`ArtifactTypeProvider`] bundles what the engine and the built-in
//! executors need to know about one content type: how to canonicalize it
//! and how to validate it. Providers are looked up by type tag in an
//! [`ArtifactTypeRegistry`]; tags are case-insensitive.

pub mod json;
pub mod text;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use registry_storage::{ContentHandle, RuleType};

use crate::error::{RulesError, RulesResult};
use crate::executor::RuleViolationCause;

pub use json::{JsonContentCanonicalizer, JsonContentValidator};
pub use text::{PassThroughCanonicalizer, PassThroughValidator};

/// Normalizes insignificant structural differences in content.
pub trait ContentCanonicalizer: Send + Sync {
    fn canonicalize(
        &self,
        content: &ContentHandle,
        resolved_references: &HashMap<String, ContentHandle>,
    ) -> RulesResult<ContentHandle>;
}

/// How strictly a validity rule checks content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ValidityLevel {
    None,
    SyntaxOnly,
    Full,
}

impl FromStr for ValidityLevel {
    type Err = RulesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NONE" => Ok(ValidityLevel::None),
            "SYNTAX_ONLY" => Ok(ValidityLevel::SyntaxOnly),
            "FULL" => Ok(ValidityLevel::Full),
            _ => Err(RulesError::InvalidConfig {
                rule_type: RuleType::Validity,
                configuration: s.to_string(),
            }),
        }
    }
}

/// Checks content against a validity level.
pub trait ContentValidator: Send + Sync {
    /// Problems found in `content`; empty when it is valid at `level`.
    fn validate(
        &self,
        level: ValidityLevel,
        content: &ContentHandle,
        resolved_references: &HashMap<String, ContentHandle>,
    ) -> RulesResult<Vec<RuleViolationCause>>;
}

/// Content handling for one artifact type.
#[derive(Clone)]
pub struct ArtifactTypeProvider {
    canonicalizer: Arc<dyn ContentCanonicalizer>,
    validator: Arc<dyn ContentValidator>,
}

impl ArtifactTypeProvider {
    pub fn new(
        canonicalizer: Arc<dyn ContentCanonicalizer>,
        validator: Arc<dyn ContentValidator>,
    ) -> Self {
        Self {
            canonicalizer,
            validator,
        }
    }

    /// JSON documents (JSON Schema and friends).
    pub fn json() -> Self {
        Self::new(
            Arc::new(JsonContentCanonicalizer),
            Arc::new(JsonContentValidator),
        )
    }

    /// Opaque content: no canonical form, any bytes are valid.
    pub fn pass_through() -> Self {
        Self::new(Arc::new(PassThroughCanonicalizer), Arc::new(PassThroughValidator))
    }

    pub fn canonicalizer(&self) -> &dyn ContentCanonicalizer {
        self.canonicalizer.as_ref()
    }

    pub fn validator(&self) -> &dyn ContentValidator {
        self.validator.as_ref()
    }
}

impl fmt::Debug for ArtifactTypeProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ArtifactTypeProvider")
    }
}

/// Artifact type tag → provider.
#[derive(Debug, Clone, Default)]
pub struct ArtifactTypeRegistry {
    providers: HashMap<String, ArtifactTypeProvider>,
}

impl ArtifactTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in `JSON` and `TEXT` types.
    pub fn with_builtin() -> Self {
        Self::new()
            .with_provider("JSON", ArtifactTypeProvider::json())
            .with_provider("TEXT", ArtifactTypeProvider::pass_through())
    }

    pub fn register(&mut self, artifact_type: &str, provider: ArtifactTypeProvider) {
        self.providers
            .insert(artifact_type.to_ascii_uppercase(), provider);
    }

    pub fn with_provider(mut self, artifact_type: &str, provider: ArtifactTypeProvider) -> Self {
        self.register(artifact_type, provider);
        self
    }

    /// Provider for `artifact_type`, or [`RulesError::UnknownArtifactType`].
    pub fn provider_for(&self, artifact_type: &str) -> RulesResult<&ArtifactTypeProvider> {
        self.providers
            .get(&artifact_type.to_ascii_uppercase())
            .ok_or_else(|| RulesError::UnknownArtifactType(artifact_type.to_string()))
    }

    pub fn contains(&self, artifact_type: &str) -> bool {
        self.providers
            .contains_key(&artifact_type.to_ascii_uppercase())
    }
}
