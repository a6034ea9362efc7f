//! JSON registry fixtures.
//!
//! A fixture describes a small registry: global rules, default global rules,
//! and artifacts with their own rules and versions. It is loaded into a
//! [`MemoryRegistryStorage`] so the engine runs against it unchanged.
//!
//! ```json
//! {
//!   "globalRules": { "VALIDITY": "FULL" },
//!   "defaults": { "INTEGRITY": "NO_DUPLICATES" },
//!   "artifacts": [
//!     {
//!       "groupId": "com.example",
//!       "artifactId": "orders",
//!       "rules": { "COMPATIBILITY": "BACKWARD" },
//!       "versions": [
//!         { "version": "1", "content": { "type": "object" } },
//!         { "version": "2", "content": "{\"type\":\"object\"}", "state": "DISABLED" }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! `content` is either a string (used verbatim) or any other JSON value
//! (stored as compact JSON).

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

use registry_rules::RulesProperties;
use registry_storage::fakes::{MemoryRegistryStorage, VersionState};
use registry_storage::{ArtifactReference, ContentHandle, RuleType};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fixture {
    #[serde(default)]
    pub global_rules: BTreeMap<RuleType, String>,
    #[serde(default)]
    pub defaults: RulesProperties,
    #[serde(default)]
    pub artifacts: Vec<FixtureArtifact>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureArtifact {
    pub group_id: String,
    pub artifact_id: String,
    #[serde(default)]
    pub rules: BTreeMap<RuleType, String>,
    #[serde(default)]
    pub versions: Vec<FixtureVersion>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureVersion {
    pub version: String,
    pub content: Value,
    #[serde(default)]
    pub state: FixtureState,
    #[serde(default)]
    pub references: Vec<ArtifactReference>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FixtureState {
    #[default]
    Enabled,
    Deprecated,
    Disabled,
}

impl From<FixtureState> for VersionState {
    fn from(state: FixtureState) -> Self {
        match state {
            FixtureState::Enabled => VersionState::Enabled,
            FixtureState::Deprecated => VersionState::Deprecated,
            FixtureState::Disabled => VersionState::Disabled,
        }
    }
}

impl FixtureVersion {
    pub fn content(&self) -> ContentHandle {
        match &self.content {
            Value::String(text) => ContentHandle::from(text.as_str()),
            other => ContentHandle::from(other.to_string()),
        }
    }
}

impl Fixture {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture: {:?}", path))?;
        serde_json::from_str(&text).with_context(|| format!("Invalid fixture JSON in {:?}", path))
    }

    /// Populate an in-memory registry. Versions are created in listed order.
    pub fn to_storage(&self) -> Result<MemoryRegistryStorage> {
        let storage = MemoryRegistryStorage::new();

        for (rule_type, configuration) in &self.global_rules {
            storage.set_global_rule(*rule_type, configuration.as_str());
        }

        for artifact in &self.artifacts {
            let (group_id, artifact_id) = (&artifact.group_id, &artifact.artifact_id);
            for (rule_type, configuration) in &artifact.rules {
                storage.set_artifact_rule(group_id, artifact_id, *rule_type, configuration.as_str());
            }
            for version in &artifact.versions {
                storage
                    .create_version(
                        group_id,
                        artifact_id,
                        &version.version,
                        version.content(),
                        &version.references,
                    )
                    .with_context(|| {
                        format!(
                            "Failed to load {}/{} version {}",
                            group_id, artifact_id, version.version
                        )
                    })?;
                if version.state != FixtureState::Enabled {
                    storage.set_version_state(
                        group_id,
                        artifact_id,
                        &version.version,
                        version.state.into(),
                    )?;
                }
            }
        }

        storage.reset_calls();
        Ok(storage)
    }
}
