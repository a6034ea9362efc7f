//! Registry Rules: rule resolution and enforcement
//!
//! Decides which rules (VALIDITY, COMPATIBILITY, INTEGRITY) apply to a
//! candidate artifact update, builds the evaluation context each rule needs,
//! and runs the rules through pluggable executors, stopping at the first
//! violation.
//!
//! ## Layer 1 - Engine
//!
//! Reads through [`registry_storage::RegistryStorage`]; never writes.
//!
//! ## Key Components
//!
//! - `RulesService`: resolution + fail-fast dispatch
//! - `resolve_rules`: artifact / global / default tier resolution
//! - `LazyContentList`: on-demand, position-cached content history
//! - `RuleExecutorRegistry`: rule type → executor
//! - `ArtifactTypeRegistry`: artifact type → canonicalizer + validator

pub mod artifact_types;
pub mod builtin;
pub mod context;
pub mod error;
pub mod executor;
pub mod lazy_content;
pub mod obs;
pub mod properties;
pub mod resolver;
pub mod service;
pub mod telemetry;

pub use artifact_types::{
    ArtifactTypeProvider, ArtifactTypeRegistry, ContentCanonicalizer, ContentValidator,
    ValidityLevel,
};
pub use builtin::{IntegrityCheck, IntegrityRuleExecutor, ValidityRuleExecutor};
pub use context::{ContentHistory, RuleContext};
pub use error::{RulesError, RulesResult};
pub use executor::{
    RuleExecutor, RuleExecutorRegistry, RuleOutcome, RuleViolation, RuleViolationCause,
};
pub use lazy_content::LazyContentList;
pub use obs::{
    emit_content_fetched, emit_rule_error, emit_rule_evaluated, emit_rule_violated,
    emit_rules_resolved, RuleApplicationSpan,
};
pub use properties::RulesProperties;
pub use resolver::{resolve_rules, DefaultRuleProvider, ResolvedRules, RuleTier};
pub use service::{RuleApplicationType, RuleRequest, RulesService};

/// Crate version, from `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
