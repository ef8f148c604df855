//! Field resolver
//!
//! Finds a normalized field's value in a raw record by probing the field's
//! candidate names in declared order. A key that exists with an explicit
//! `null` value still counts as a match.

use super::error::ConversionError;
use super::model::FieldSpec;
use serde_json::{Map, Value};

/// Outcome of resolving one field against one raw record
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedField {
    /// No candidate key is present in the record
    Absent,
    /// A candidate matched; `value` is after conversion
    Matched { key: String, value: Value },
    /// A candidate matched but its conversion failed
    Failed(ConversionError),
}

impl ResolvedField {
    /// Normalized value, `Null` when absent or failed
    pub fn value(&self) -> Value {
        match self {
            ResolvedField::Matched { value, .. } => value.clone(),
            _ => Value::Null,
        }
    }
}

/// Resolve one field spec against a raw record
pub fn resolve(spec: &FieldSpec, record: &Map<String, Value>) -> ResolvedField {
    let Some((key, raw)) = find_candidate(spec, record) else {
        return ResolvedField::Absent;
    };

    match &spec.conversion {
        None => ResolvedField::Matched {
            key: key.clone(),
            value: raw.clone(),
        },
        Some(conversion) => match conversion.apply(raw) {
            Ok(value) => ResolvedField::Matched {
                key: key.clone(),
                value,
            },
            Err(e) => ResolvedField::Failed(ConversionError {
                field: spec.field.name().to_string(),
                candidate: key.clone(),
                reason: e.to_string(),
            }),
        },
    }
}

fn find_candidate<'a>(spec: &FieldSpec, record: &'a Map<String, Value>) -> Option<(&'a String, &'a Value)> {
    spec.candidates.iter().find_map(|candidate| {
        record.get_key_value(candidate.as_str()).or_else(|| {
            if spec.case_insensitive {
                record.iter().find(|(key, _)| key.eq_ignore_ascii_case(candidate))
            } else {
                None
            }
        })
    })
}
