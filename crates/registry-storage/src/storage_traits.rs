//! Storage trait definitions for the registry rules engine
//!
//! The engine reads everything it needs through [`RegistryStorage`]:
//! - rule configuration at artifact and global scope
//! - the ordered content ids of an artifact's enabled versions
//! - content blobs by id, and full stored versions by label
//!
//! The trait is synchronous and backend-agnostic. An in-memory fake is
//! provided for testing via the `fakes` module.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{ParseRuleTypeError, StorageError};

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// Content
// ---------------------------------------------------------------------------

/// Content digest (SHA-256 hex string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Compute the SHA-256 digest of the given bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        ContentDigest(hex::encode(hasher.finalize()))
    }

    /// Return the full hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 12 hex chars).
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Immutable artifact content.
///
/// Cloning is cheap (the bytes are shared). Two handles compare equal when
/// their bytes are equal, regardless of where they were loaded from.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ContentHandle(Arc<[u8]>);

impl ContentHandle {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        ContentHandle(Arc::from(bytes.into()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Content as UTF-8 text, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// SHA-256 digest of the content bytes.
    pub fn digest(&self) -> ContentDigest {
        ContentDigest::from_bytes(&self.0)
    }
}

impl fmt::Debug for ContentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ContentHandle({} bytes, {})",
            self.0.len(),
            self.digest().short()
        )
    }
}

impl From<&str> for ContentHandle {
    fn from(s: &str) -> Self {
        ContentHandle::from_bytes(s.as_bytes())
    }
}

impl From<String> for ContentHandle {
    fn from(s: String) -> Self {
        ContentHandle::from_bytes(s.into_bytes())
    }
}

impl From<Vec<u8>> for ContentHandle {
    fn from(bytes: Vec<u8>) -> Self {
        ContentHandle::from_bytes(bytes)
    }
}

/// Identity of a distinct content blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(pub i64);

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry-wide identity of a single artifact version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GlobalId(pub i64);

impl fmt::Display for GlobalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Class of validation applied to artifact content.
///
/// Declaration order is the evaluation order when several rules apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleType {
    Validity,
    Compatibility,
    Integrity,
}

impl RuleType {
    /// All rule types in declaration order.
    pub const ALL: [RuleType; 3] = [
        RuleType::Validity,
        RuleType::Compatibility,
        RuleType::Integrity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleType::Validity => "VALIDITY",
            RuleType::Compatibility => "COMPATIBILITY",
            RuleType::Integrity => "INTEGRITY",
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleType {
    type Err = ParseRuleTypeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        RuleType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseRuleTypeError(s.to_string()))
    }
}

/// Opaque rule configuration, interpreted only by the matching executor
/// (e.g. a compatibility level such as `BACKWARD`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleConfiguration(String);

impl RuleConfiguration {
    pub fn new(configuration: impl Into<String>) -> Self {
        RuleConfiguration(configuration.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuleConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RuleConfiguration {
    fn from(s: &str) -> Self {
        RuleConfiguration::new(s)
    }
}

// ---------------------------------------------------------------------------
// Stored artifacts
// ---------------------------------------------------------------------------

/// Named pointer from one artifact's content to another artifact version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactReference {
    /// Group of the referenced artifact (`None` for the default group)
    pub group_id: Option<String>,
    /// Referenced artifact id
    pub artifact_id: String,
    /// Referenced version label (`None` means latest)
    pub version: Option<String>,
    /// Name under which the content refers to it
    pub name: String,
}

impl ArtifactReference {
    pub fn new(
        group_id: Option<&str>,
        artifact_id: impl Into<String>,
        version: Option<&str>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.map(String::from),
            artifact_id: artifact_id.into(),
            version: version.map(String::from),
            name: name.into(),
        }
    }
}

/// One stored version of an artifact, as read back from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub content: ContentHandle,
    pub content_id: ContentId,
    pub global_id: GlobalId,
    /// Caller-assigned label; not guaranteed to sort meaningfully
    pub version: String,
    /// Monotonically assigned per artifact; use this, not `version`, for ordering
    pub version_order: i32,
    pub references: Vec<ArtifactReference>,
}

// ---------------------------------------------------------------------------
// RegistryStorage: read interface
// ---------------------------------------------------------------------------

/// Read-only view of the registry consumed by the rules engine.
///
/// Guarantees:
/// - `enabled_content_ids` is ordered by version order (oldest first) and
///   omits disabled versions.
/// - `artifact_rule`/`global_rule` succeed for every type returned by the
///   matching listing call.
/// - Failures (not found, I/O) are reported as [`StorageError`]; the engine
///   propagates them unchanged.
pub trait RegistryStorage: Send + Sync {
    /// Rule types explicitly configured for one artifact (may be empty).
    fn artifact_rules(&self, group_id: &str, artifact_id: &str) -> StorageResult<Vec<RuleType>>;

    /// Configuration of one artifact-level rule.
    fn artifact_rule(
        &self,
        group_id: &str,
        artifact_id: &str,
        rule_type: RuleType,
    ) -> StorageResult<RuleConfiguration>;

    /// Rule types configured registry-wide.
    fn global_rules(&self) -> StorageResult<Vec<RuleType>>;

    /// Configuration of one global rule.
    fn global_rule(&self, rule_type: RuleType) -> StorageResult<RuleConfiguration>;

    /// Content ids of the artifact's enabled versions, oldest first.
    fn enabled_content_ids(&self, group_id: &str, artifact_id: &str)
        -> StorageResult<Vec<ContentId>>;

    /// Content blob by id.
    fn content_by_id(&self, content_id: ContentId) -> StorageResult<ContentHandle>;

    /// A single stored version by label.
    fn artifact_version(
        &self,
        group_id: &str,
        artifact_id: &str,
        version: &str,
    ) -> StorageResult<StoredArtifact>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_type_parse_is_case_insensitive() {
        assert_eq!("validity".parse::<RuleType>().unwrap(), RuleType::Validity);
        assert_eq!(
            " COMPATIBILITY ".parse::<RuleType>().unwrap(),
            RuleType::Compatibility
        );
        assert!("LINT".parse::<RuleType>().is_err());
    }

    #[test]
    fn rule_type_order_follows_declaration() {
        let mut types = vec![
            RuleType::Integrity,
            RuleType::Validity,
            RuleType::Compatibility,
        ];
        types.sort();
        assert_eq!(types, RuleType::ALL.to_vec());
    }

    #[test]
    fn rule_type_serializes_screaming_case() {
        let json = serde_json::to_string(&RuleType::Compatibility).unwrap();
        assert_eq!(json, "\"COMPATIBILITY\"");
    }

    #[test]
    fn content_handle_equality_is_by_bytes() {
        let a = ContentHandle::from("{\"a\":1}");
        let b = ContentHandle::from_bytes(b"{\"a\":1}".to_vec());
        assert_eq!(a, b);
        assert_eq!(a.digest(), b.digest());
        assert_ne!(a, ContentHandle::from("{}"));
    }

    #[test]
    fn content_handle_debug_is_short() {
        let handle = ContentHandle::from("hello");
        let debug = format!("{:?}", handle);
        assert!(debug.starts_with("ContentHandle(5 bytes, "));
    }

    #[test]
    fn content_handle_as_str_rejects_invalid_utf8() {
        let handle = ContentHandle::from_bytes(vec![0xff, 0xfe]);
        assert!(handle.as_str().is_none());
    }
}
