//! Mapping configuration model

use super::transform::Conversion;
use crate::schema::CanonicalField;
use serde::Serialize;
use std::collections::BTreeMap;

/// How one normalized field is found in a source's raw records
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSpec {
    #[serde(skip)]
    pub field: CanonicalField,

    /// Raw key names to probe, earliest match wins (never empty)
    pub candidates: Vec<String>,

    /// Applied to the matched value; `None` passes the value through
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversion: Option<Conversion>,

    /// Fall back to ASCII case-insensitive key comparison per candidate
    pub case_insensitive: bool,
}

impl FieldSpec {
    pub fn new(field: CanonicalField, candidates: Vec<String>) -> Self {
        Self {
            field,
            candidates,
            conversion: None,
            case_insensitive: false,
        }
    }

    pub fn with_conversion(mut self, conversion: Conversion) -> Self {
        self.conversion = Some(conversion);
        self
    }

    pub fn case_insensitive(mut self, enabled: bool) -> Self {
        self.case_insensitive = enabled;
        self
    }
}

/// Mapping for one upstream source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappingConfig {
    pub source_id: String,
    pub fields: BTreeMap<CanonicalField, FieldSpec>,
}

impl MappingConfig {
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, spec: FieldSpec) -> Self {
        self.fields.insert(spec.field, spec);
        self
    }

    /// Field spec for a canonical field, if this source maps it
    pub fn field(&self, field: CanonicalField) -> Option<&FieldSpec> {
        self.fields.get(&field)
    }
}
