//! Persisted row shapes and their decoding
//!
//! Versions are stored one row per version with the columns:
//! - `content`: raw bytes
//! - `contentId`, `globalId`: 64-bit identities
//! - `version`: caller-assigned label
//! - `versionOrder`: per-artifact monotonic order
//! - `artifactreferences`: JSON-encoded reference list (nullable)

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StorageError;
use crate::storage_traits::{
    ArtifactReference, ContentHandle, ContentId, GlobalId, StorageResult, StoredArtifact,
};

const REFERENCES_COLUMN: &str = "artifactreferences";

/// A single persisted version row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredArtifactRow {
    /// Raw content bytes
    pub content: Vec<u8>,
    #[serde(rename = "contentId")]
    pub content_id: i64,
    #[serde(rename = "globalId")]
    pub global_id: i64,
    /// Version label
    pub version: String,
    #[serde(rename = "versionOrder")]
    pub version_order: i32,
    /// Encoded reference list; `None` when the column is null
    #[serde(rename = "artifactreferences", default)]
    pub artifact_references: Option<String>,
}

impl StoredArtifactRow {
    /// Assemble the in-memory record for this row.
    ///
    /// Fails with [`StorageError::MalformedData`] when the reference column
    /// holds a non-empty value that does not decode.
    pub fn into_stored_artifact(self) -> StorageResult<StoredArtifact> {
        let references = deserialize_references(self.artifact_references.as_deref())?;
        Ok(StoredArtifact {
            content: ContentHandle::from_bytes(self.content),
            content_id: ContentId(self.content_id),
            global_id: GlobalId(self.global_id),
            version: self.version,
            version_order: self.version_order,
            references,
        })
    }
}

impl TryFrom<StoredArtifactRow> for StoredArtifact {
    type Error = StorageError;

    fn try_from(row: StoredArtifactRow) -> std::result::Result<Self, Self::Error> {
        row.into_stored_artifact()
    }
}

/// Decode the persisted reference-list column.
///
/// `None` and `""` both decode to an empty list. Anything else must be a
/// JSON array of reference objects; order and every field are preserved.
/// A value that does not decode is an error, never a partial list.
pub fn deserialize_references(encoded: Option<&str>) -> StorageResult<Vec<ArtifactReference>> {
    let encoded = match encoded {
        None => return Ok(Vec::new()),
        Some(s) if s.is_empty() => return Ok(Vec::new()),
        Some(s) => s,
    };

    let references: Vec<ArtifactReference> =
        serde_json::from_str(encoded).map_err(|e| StorageError::MalformedData {
            field: REFERENCES_COLUMN.to_string(),
            reason: e.to_string(),
        })?;

    debug!(count = references.len(), "decoded artifact references");
    Ok(references)
}

/// Encode a reference list for the `artifactreferences` column.
///
/// An empty list encodes to `None` (stored as null).
pub fn serialize_references(references: &[ArtifactReference]) -> StorageResult<Option<String>> {
    if references.is_empty() {
        return Ok(None);
    }
    serde_json::to_string(references)
        .map(Some)
        .map_err(|e| StorageError::Serialization(e.to_string()))
}
