//! Structured tracing events for rule application.
//!
//! Every event carries an `event` field so log pipelines can filter on it:
//!
//! | event | level |
//! |---|---|
//! | `rules.resolved` | info |
//! | `rule.evaluated` | debug |
//! | `rule.violated` | warn |
//! | `rule.error` | warn |
//! | `content.fetched` | debug |

use tracing::{debug, info, warn};

use registry_storage::{ContentId, RuleType};

use crate::resolver::RuleTier;

/// RAII guard that enters an artifact-scoped span for one rule application.
///
/// ```ignore
/// let _span = RuleApplicationSpan::enter("com.example", "orders", "update");
/// ```
pub struct RuleApplicationSpan {
    _span: tracing::span::EnteredSpan,
}

impl RuleApplicationSpan {
    pub fn enter(group_id: &str, artifact_id: &str, mode: &str) -> Self {
        let span = tracing::info_span!(
            "registry.rules",
            group_id = %group_id,
            artifact_id = %artifact_id,
            mode = %mode,
        );
        Self {
            _span: span.entered(),
        }
    }
}

pub fn emit_rules_resolved(tier: RuleTier, rule_count: usize) {
    info!(event = "rules.resolved", tier = tier.as_str(), rule_count = rule_count);
}

pub fn emit_rule_evaluated(rule_type: RuleType, satisfied: bool) {
    debug!(event = "rule.evaluated", rule_type = %rule_type, satisfied = satisfied);
}

pub fn emit_rule_violated(rule_type: RuleType, reason: &str, cause_count: usize) {
    warn!(
        event = "rule.violated",
        rule_type = %rule_type,
        reason = %reason,
        cause_count = cause_count,
    );
}

/// Executor or lookup failure (warning level).
pub fn emit_rule_error(rule_type: RuleType, error: &dyn std::fmt::Display) {
    warn!(event = "rule.error", rule_type = %rule_type, error = %error);
}

pub fn emit_content_fetched(content_id: ContentId, index: usize) {
    debug!(event = "content.fetched", content_id = %content_id, index = index);
}
