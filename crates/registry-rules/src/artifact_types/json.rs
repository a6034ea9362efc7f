//! JSON canonicalization and validation.
//!
//! The canonical form is compact JSON with:
//! - object keys ordered by UTF-16 code units (RFC 8785 §3.2.3)
//! - integer-valued floats written as integers
//! - array order preserved

use std::collections::HashMap;

use serde_json::{Map, Number, Value};

use registry_storage::ContentHandle;

use super::{ContentCanonicalizer, ContentValidator, ValidityLevel};
use crate::error::{RulesError, RulesResult};
use crate::executor::RuleViolationCause;

const ARTIFACT_TYPE: &str = "JSON";

fn parse(content: &ContentHandle) -> Result<Value, serde_json::Error> {
    serde_json::from_slice(content.as_bytes())
}

/// Integer-valued floats → integer repr.
fn normalize_number(n: &Number) -> Number {
    if n.is_i64() || n.is_u64() {
        return n.clone();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => {
            Number::from(f as i64)
        }
        _ => n.clone(),
    }
}

fn sorted_keys_utf16(map: &Map<String, Value>) -> Vec<&String> {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort_by(|a, b| a.encode_utf16().cmp(b.encode_utf16()));
    keys
}

fn write_canonical(value: &Value, out: &mut String) -> Result<(), serde_json::Error> {
    match value {
        Value::Object(map) => {
            out.push('{');
            for (i, key) in sorted_keys_utf16(map).into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key)?);
                out.push(':');
                write_canonical(&map[key.as_str()], out)?;
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out)?;
            }
            out.push(']');
        }
        Value::Number(n) => out.push_str(&normalize_number(n).to_string()),
        other => out.push_str(&serde_json::to_string(other)?),
    }
    Ok(())
}

/// Canonical JSON text for `value`.
pub fn canonical_json(value: &Value) -> Result<String, serde_json::Error> {
    let mut out = String::new();
    write_canonical(value, &mut out)?;
    Ok(out)
}

/// Canonicalizes JSON documents. References are not inlined.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonContentCanonicalizer;

impl ContentCanonicalizer for JsonContentCanonicalizer {
    fn canonicalize(
        &self,
        content: &ContentHandle,
        _resolved_references: &HashMap<String, ContentHandle>,
    ) -> RulesResult<ContentHandle> {
        let to_error = |e: serde_json::Error| RulesError::Canonicalization {
            artifact_type: ARTIFACT_TYPE.to_string(),
            reason: e.to_string(),
        };
        let value = parse(content).map_err(to_error)?;
        let canonical = canonical_json(&value).map_err(to_error)?;
        Ok(ContentHandle::from(canonical))
    }
}

/// Validates JSON documents.
///
/// - `SYNTAX_ONLY`: content parses as JSON.
/// - `FULL`: additionally, the top-level value is an object.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonContentValidator;

impl ContentValidator for JsonContentValidator {
    fn validate(
        &self,
        level: ValidityLevel,
        content: &ContentHandle,
        _resolved_references: &HashMap<String, ContentHandle>,
    ) -> RulesResult<Vec<RuleViolationCause>> {
        if level == ValidityLevel::None {
            return Ok(Vec::new());
        }

        let value = match parse(content) {
            Ok(v) => v,
            Err(e) => {
                return Ok(vec![RuleViolationCause::new(
                    format!("invalid JSON: {}", e),
                    format!("line {}, column {}", e.line(), e.column()),
                )])
            }
        };

        if level == ValidityLevel::Full && !value.is_object() {
            return Ok(vec![RuleViolationCause::new(
                "top-level value must be a JSON object",
                "/",
            )]);
        }

        Ok(Vec::new())
    }
}
