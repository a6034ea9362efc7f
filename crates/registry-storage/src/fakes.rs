//! In-memory fake for the storage trait (testing only)
//!
//! Provides `MemoryRegistryStorage`, which satisfies the `RegistryStorage`
//! contract without any external dependencies. Every read is counted per
//! [`StorageCall`] so tests can assert how often the engine touched storage,
//! and content fetches can be made to fail on demand.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use crate::error::StorageError;
use crate::schema::{serialize_references, StoredArtifactRow};
use crate::storage_traits::*;

/// Storage read operations, for call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageCall {
    ArtifactRules,
    ArtifactRule,
    GlobalRules,
    GlobalRule,
    EnabledContentIds,
    ContentById,
    ArtifactVersion,
}

/// Lifecycle state of a stored version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VersionState {
    #[default]
    Enabled,
    Deprecated,
    Disabled,
}

#[derive(Debug)]
struct VersionEntry {
    row: StoredArtifactRow,
    state: VersionState,
}

#[derive(Debug, Default)]
struct ArtifactEntry {
    rules: BTreeMap<RuleType, RuleConfiguration>,
    versions: Vec<VersionEntry>,
}

#[derive(Debug, Default)]
struct RegistryState {
    global_rules: BTreeMap<RuleType, RuleConfiguration>,
    artifacts: HashMap<(String, String), ArtifactEntry>,
    contents: BTreeMap<ContentId, ContentHandle>,
    content_ids_by_digest: HashMap<ContentDigest, ContentId>,
    next_global_id: i64,
}

/// In-memory registry backed by `HashMap`s keyed on `(group_id, artifact_id)`.
///
/// Versions are kept as persisted rows and assembled through
/// [`StoredArtifactRow::into_stored_artifact`] on read, so reads exercise the
/// same decoding path as a real backend. Identical content is stored once.
#[derive(Debug, Default)]
pub struct MemoryRegistryStorage {
    state: Mutex<RegistryState>,
    calls: Mutex<HashMap<StorageCall, usize>>,
    failing_fetches: Mutex<HashMap<ContentId, usize>>,
}

impl MemoryRegistryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure a registry-wide rule.
    pub fn set_global_rule(&self, rule_type: RuleType, configuration: impl Into<String>) {
        let mut state = self.state.lock().unwrap();
        state
            .global_rules
            .insert(rule_type, RuleConfiguration::new(configuration));
    }

    /// Configure a rule on one artifact, creating the artifact if needed.
    pub fn set_artifact_rule(
        &self,
        group_id: &str,
        artifact_id: &str,
        rule_type: RuleType,
        configuration: impl Into<String>,
    ) {
        let mut state = self.state.lock().unwrap();
        state
            .artifacts
            .entry((group_id.to_string(), artifact_id.to_string()))
            .or_default()
            .rules
            .insert(rule_type, RuleConfiguration::new(configuration));
    }

    /// Append a new version and return the assembled record.
    pub fn create_version(
        &self,
        group_id: &str,
        artifact_id: &str,
        version: &str,
        content: impl Into<ContentHandle>,
        references: &[ArtifactReference],
    ) -> StorageResult<StoredArtifact> {
        let content = content.into();
        let encoded_refs = serialize_references(references)?;

        let mut state = self.state.lock().unwrap();
        let digest = content.digest();
        let content_id = match state.content_ids_by_digest.get(&digest) {
            Some(id) => *id,
            None => {
                let id = ContentId(state.contents.len() as i64 + 1);
                state.contents.insert(id, content.clone());
                state.content_ids_by_digest.insert(digest, id);
                id
            }
        };
        state.next_global_id += 1;
        let global_id = state.next_global_id;

        let artifact = state
            .artifacts
            .entry((group_id.to_string(), artifact_id.to_string()))
            .or_default();
        let version_order = artifact
            .versions
            .iter()
            .map(|v| v.row.version_order)
            .max()
            .unwrap_or(0)
            + 1;

        let row = StoredArtifactRow {
            content: content.as_bytes().to_vec(),
            content_id: content_id.0,
            global_id,
            version: version.to_string(),
            version_order,
            artifact_references: encoded_refs,
        };
        artifact.versions.push(VersionEntry {
            row: row.clone(),
            state: VersionState::Enabled,
        });
        row.into_stored_artifact()
    }

    /// Change the state of an existing version.
    pub fn set_version_state(
        &self,
        group_id: &str,
        artifact_id: &str,
        version: &str,
        new_state: VersionState,
    ) -> StorageResult<()> {
        let mut state = self.state.lock().unwrap();
        let artifact = state
            .artifacts
            .get_mut(&(group_id.to_string(), artifact_id.to_string()))
            .ok_or_else(|| StorageError::ArtifactNotFound {
                group_id: group_id.to_string(),
                artifact_id: artifact_id.to_string(),
            })?;
        let entry = artifact
            .versions
            .iter_mut()
            .find(|v| v.row.version == version)
            .ok_or_else(|| StorageError::VersionNotFound {
                group_id: group_id.to_string(),
                artifact_id: artifact_id.to_string(),
                version: version.to_string(),
            })?;
        entry.state = new_state;
        Ok(())
    }

    /// Make the next `times` fetches of `content_id` fail with a backend error.
    pub fn fail_content_fetches(&self, content_id: ContentId, times: usize) {
        let mut failing = self.failing_fetches.lock().unwrap();
        failing.insert(content_id, times);
    }

    /// Number of times `call` has been made since creation or the last reset.
    pub fn calls(&self, call: StorageCall) -> usize {
        let calls = self.calls.lock().unwrap();
        calls.get(&call).copied().unwrap_or(0)
    }

    /// Total calls across all operations.
    pub fn total_calls(&self) -> usize {
        let calls = self.calls.lock().unwrap();
        calls.values().sum()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: StorageCall) {
        let mut calls = self.calls.lock().unwrap();
        *calls.entry(call).or_insert(0) += 1;
    }
}

fn artifact_not_found(group_id: &str, artifact_id: &str) -> StorageError {
    StorageError::ArtifactNotFound {
        group_id: group_id.to_string(),
        artifact_id: artifact_id.to_string(),
    }
}

impl RegistryStorage for MemoryRegistryStorage {
    fn artifact_rules(&self, group_id: &str, artifact_id: &str) -> StorageResult<Vec<RuleType>> {
        self.record(StorageCall::ArtifactRules);
        let state = self.state.lock().unwrap();
        state
            .artifacts
            .get(&(group_id.to_string(), artifact_id.to_string()))
            .map(|a| a.rules.keys().copied().collect())
            .ok_or_else(|| artifact_not_found(group_id, artifact_id))
    }

    fn artifact_rule(
        &self,
        group_id: &str,
        artifact_id: &str,
        rule_type: RuleType,
    ) -> StorageResult<RuleConfiguration> {
        self.record(StorageCall::ArtifactRule);
        let state = self.state.lock().unwrap();
        let artifact = state
            .artifacts
            .get(&(group_id.to_string(), artifact_id.to_string()))
            .ok_or_else(|| artifact_not_found(group_id, artifact_id))?;
        artifact
            .rules
            .get(&rule_type)
            .cloned()
            .ok_or_else(|| StorageError::RuleNotConfigured {
                rule_type,
                scope: format!("{}/{}", group_id, artifact_id),
            })
    }

    fn global_rules(&self) -> StorageResult<Vec<RuleType>> {
        self.record(StorageCall::GlobalRules);
        let state = self.state.lock().unwrap();
        Ok(state.global_rules.keys().copied().collect())
    }

    fn global_rule(&self, rule_type: RuleType) -> StorageResult<RuleConfiguration> {
        self.record(StorageCall::GlobalRule);
        let state = self.state.lock().unwrap();
        state
            .global_rules
            .get(&rule_type)
            .cloned()
            .ok_or_else(|| StorageError::RuleNotConfigured {
                rule_type,
                scope: "global".to_string(),
            })
    }

    fn enabled_content_ids(
        &self,
        group_id: &str,
        artifact_id: &str,
    ) -> StorageResult<Vec<ContentId>> {
        self.record(StorageCall::EnabledContentIds);
        let state = self.state.lock().unwrap();
        let artifact = state
            .artifacts
            .get(&(group_id.to_string(), artifact_id.to_string()))
            .ok_or_else(|| artifact_not_found(group_id, artifact_id))?;
        let mut enabled: Vec<&VersionEntry> = artifact
            .versions
            .iter()
            .filter(|v| v.state != VersionState::Disabled)
            .collect();
        enabled.sort_by_key(|v| v.row.version_order);
        Ok(enabled
            .into_iter()
            .map(|v| ContentId(v.row.content_id))
            .collect())
    }

    fn content_by_id(&self, content_id: ContentId) -> StorageResult<ContentHandle> {
        self.record(StorageCall::ContentById);
        {
            let mut failing = self.failing_fetches.lock().unwrap();
            if let Some(remaining) = failing.get_mut(&content_id) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(StorageError::Backend(format!(
                        "injected fetch failure for content {}",
                        content_id
                    )));
                }
            }
        }
        let state = self.state.lock().unwrap();
        state
            .contents
            .get(&content_id)
            .cloned()
            .ok_or(StorageError::ContentNotFound { content_id })
    }

    fn artifact_version(
        &self,
        group_id: &str,
        artifact_id: &str,
        version: &str,
    ) -> StorageResult<StoredArtifact> {
        self.record(StorageCall::ArtifactVersion);
        let row = {
            let state = self.state.lock().unwrap();
            let artifact = state
                .artifacts
                .get(&(group_id.to_string(), artifact_id.to_string()))
                .ok_or_else(|| artifact_not_found(group_id, artifact_id))?;
            artifact
                .versions
                .iter()
                .find(|v| v.row.version == version)
                .map(|v| v.row.clone())
                .ok_or_else(|| StorageError::VersionNotFound {
                    group_id: group_id.to_string(),
                    artifact_id: artifact_id.to_string(),
                    version: version.to_string(),
                })?
        };
        row.into_stored_artifact()
    }
}
