//! Registry-Storage: read-side persistence model for the rules engine
//!
//! This crate defines the narrow storage interface the rules engine reads
//! through, plus the record shapes that come back from it. It never writes
//! to a backend itself; backends implement [`RegistryStorage`].
//!
//! ## Layer 0 - Data/Persistence
//!
//! Focus: faithful decoding of persisted rows and a stable read contract.
//!
//! ## Key Components
//!
//! - `RegistryStorage`: rule configuration, content-id and content reads
//! - `StoredArtifactRow`: one persisted version row, assembled into a `StoredArtifact`
//! - `deserialize_references`: decoder for the persisted reference-list encoding

mod error;
pub mod fakes;
mod schema;
pub mod storage_traits;

pub use error::{ParseRuleTypeError, StorageError};
pub use schema::{deserialize_references, serialize_references, StoredArtifactRow};
pub use storage_traits::{
    ArtifactReference, ContentDigest, ContentHandle, ContentId, GlobalId, RegistryStorage,
    RuleConfiguration, RuleType, StorageResult, StoredArtifact,
};
