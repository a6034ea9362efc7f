//! Opaque content types: no canonical form, no structure to validate.

use std::collections::HashMap;

use registry_storage::ContentHandle;

use super::{ContentCanonicalizer, ContentValidator, ValidityLevel};
use crate::error::RulesResult;
use crate::executor::RuleViolationCause;

/// Returns content unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughCanonicalizer;

impl ContentCanonicalizer for PassThroughCanonicalizer {
    fn canonicalize(
        &self,
        content: &ContentHandle,
        _resolved_references: &HashMap<String, ContentHandle>,
    ) -> RulesResult<ContentHandle> {
        Ok(content.clone())
    }
}

/// Accepts any UTF-8 content at `SYNTAX_ONLY` and above.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughValidator;

impl ContentValidator for PassThroughValidator {
    fn validate(
        &self,
        level: ValidityLevel,
        content: &ContentHandle,
        _resolved_references: &HashMap<String, ContentHandle>,
    ) -> RulesResult<Vec<RuleViolationCause>> {
        if level > ValidityLevel::None && content.as_str().is_none() {
            return Ok(vec![RuleViolationCause::new(
                "content is not valid UTF-8",
                "/",
            )]);
        }
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_through_keeps_bytes() {
        let content = ContentHandle::from("  anything \n");
        let out = PassThroughCanonicalizer
            .canonicalize(&content, &HashMap::new())
            .unwrap();
        assert_eq!(out, content);
    }

    #[test]
    fn non_utf8_fails_syntax_check() {
        let bytes = ContentHandle::from_bytes(vec![0xc3, 0x28]);
        let refs = HashMap::new();
        assert!(PassThroughValidator
            .validate(ValidityLevel::None, &bytes, &refs)
            .unwrap()
            .is_empty());
        assert_eq!(
            PassThroughValidator
                .validate(ValidityLevel::SyntaxOnly, &bytes, &refs)
                .unwrap()
                .len(),
            1
        );
    }
}
