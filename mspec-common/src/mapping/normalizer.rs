//! Ingestion normalizer
//!
//! Normalizes a batch of raw records for one source against a single
//! configuration snapshot, producing exactly one outcome per input record in
//! input order. One record's failure never affects its siblings.

use super::error::{ConfigError, ConversionError, RecordError};
use super::model::MappingConfig;
use super::resolver::{resolve, ResolvedField};
use super::store::MappingStore;
use crate::schema::CanonicalField;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// What happens to a record when one of its fields cannot be resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldErrorPolicy {
    /// Null the failed field, keep the record, record a diagnostic
    #[default]
    NullField,
    /// Reject the record on any conversion failure or missing required field
    FailRecord,
}

/// A raw record translated into the canonical schema
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRecord {
    pub source_id: String,
    pub ingested_at: DateTime<Utc>,
    /// One entry per canonical field; `Null` when unresolved
    pub fields: BTreeMap<CanonicalField, Value>,
    /// Conversion failures that were nulled out
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<ConversionError>,
}

impl NormalizedRecord {
    pub fn get(&self, field: CanonicalField) -> &Value {
        self.fields.get(&field).unwrap_or(&Value::Null)
    }
}

pub type RecordOutcome = Result<NormalizedRecord, RecordError>;

/// Batch normalizer bound to a mapping store
pub struct Normalizer {
    store: Arc<MappingStore>,
    policy: FieldErrorPolicy,
}

impl Normalizer {
    pub fn new(store: Arc<MappingStore>, policy: FieldErrorPolicy) -> Self {
        Self { store, policy }
    }

    pub fn store(&self) -> &Arc<MappingStore> {
        &self.store
    }

    pub fn policy(&self) -> FieldErrorPolicy {
        self.policy
    }

    /// Normalize a batch, stamping every record with the current time
    pub fn normalize(&self, source_id: &str, records: &[Value]) -> Result<Vec<RecordOutcome>, ConfigError> {
        self.normalize_at(source_id, records, Utc::now())
    }

    /// Normalize a batch with an explicit ingestion timestamp
    ///
    /// The source mapping is looked up once; a concurrent reload does not
    /// affect records of this batch.
    pub fn normalize_at(
        &self,
        source_id: &str,
        records: &[Value],
        ingested_at: DateTime<Utc>,
    ) -> Result<Vec<RecordOutcome>, ConfigError> {
        let mapping = self.store.get(source_id)?;
        debug!("Normalizing {} record(s) for source '{}'", records.len(), source_id);

        let outcomes = records
            .iter()
            .enumerate()
            .map(|(index, item)| normalize_record(&mapping, index, item, self.policy, ingested_at))
            .collect();
        Ok(outcomes)
    }
}

/// Normalize one batch item against a source mapping
pub fn normalize_record(
    mapping: &MappingConfig,
    index: usize,
    item: &Value,
    policy: FieldErrorPolicy,
    ingested_at: DateTime<Utc>,
) -> RecordOutcome {
    let Some(raw) = item.as_object() else {
        warn!("Item {} for source '{}' is not a JSON object", index, mapping.source_id);
        return Err(RecordError::NotAnObject { index });
    };

    let mut fields = BTreeMap::new();
    let mut diagnostics = Vec::new();

    for field in CanonicalField::ALL {
        let resolved = match mapping.field(field) {
            Some(spec) => resolve(spec, raw),
            None => ResolvedField::Absent,
        };

        if let ResolvedField::Failed(error) = &resolved {
            if policy == FieldErrorPolicy::FailRecord {
                warn!("Rejecting item {} for source '{}': {}", index, mapping.source_id, error);
                return Err(RecordError::ConversionFailed {
                    index,
                    error: error.clone(),
                });
            }
            warn!("Item {} for source '{}': {}", index, mapping.source_id, error);
            diagnostics.push(error.clone());
        }

        let value = resolved.value();
        if policy == FieldErrorPolicy::FailRecord && field.is_required() && value.is_null() {
            warn!(
                "Rejecting item {} for source '{}': missing required field '{}'",
                index, mapping.source_id, field
            );
            return Err(RecordError::MissingRequired {
                index,
                field: field.name().to_string(),
            });
        }
        fields.insert(field, value);
    }

    if fields.values().all(Value::is_null) {
        warn!("Item {} for source '{}' resolved no fields", index, mapping.source_id);
        return Err(RecordError::NoFieldsResolved { index, diagnostics });
    }

    Ok(NormalizedRecord {
        source_id: mapping.source_id.clone(),
        ingested_at,
        fields,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::loader::StaticSource;
    use serde_json::json;

    fn normalizer(policy: FieldErrorPolicy) -> Normalizer {
        let store = MappingStore::new(StaticSource::new(json!({
            "team_a": {
                "fields": {
                    "os": ["os"],
                    "cpu": ["cpu_model", "cpu"],
                    "memory_gb": {"candidates": ["mem_mb", "memory"], "conversion": "scale(1/1024)"}
                }
            },
            "team_b": {
                "os": "OperatingSystem",
                "cpu": "CPU",
                "memory_gb": {"candidates": ["RAM"], "conversion": "leading_int()"}
            }
        })));
        Normalizer::new(Arc::new(store), policy)
    }

    fn at() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_normalizes_with_conversion() {
        let n = normalizer(FieldErrorPolicy::NullField);
        let out = n
            .normalize_at("team_a", &[json!({"os": "Ubuntu", "cpu_model": "Xeon", "mem_mb": 8192})], at())
            .unwrap();
        let record = out[0].as_ref().unwrap();
        assert_eq!(record.source_id, "team_a");
        assert_eq!(record.ingested_at, at());
        assert_eq!(record.get(CanonicalField::Os), &json!("Ubuntu"));
        assert_eq!(record.get(CanonicalField::Cpu), &json!("Xeon"));
        assert_eq!(record.get(CanonicalField::MemoryGb), &json!(8.0));
        assert!(record.diagnostics.is_empty());
    }

    #[test]
    fn test_every_canonical_field_present() {
        let n = normalizer(FieldErrorPolicy::NullField);
        let out = n.normalize_at("team_b", &[json!({"OperatingSystem": "Debian 12"})], at()).unwrap();
        let record = out[0].as_ref().unwrap();
        assert_eq!(record.fields.len(), CanonicalField::ALL.len());
        assert_eq!(record.get(CanonicalField::Cpu), &Value::Null);
    }

    #[test]
    fn test_unknown_source_fails_whole_call() {
        let n = normalizer(FieldErrorPolicy::NullField);
        let err = n.normalize("team_z", &[json!({"os": "x"})]).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownSource { .. }));
    }

    #[test]
    fn test_conversion_failure_nulls_field() {
        let n = normalizer(FieldErrorPolicy::NullField);
        let out = n
            .normalize_at("team_b", &[json!({"OperatingSystem": "Debian", "CPU": "i7", "RAM": "lots"})], at())
            .unwrap();
        let record = out[0].as_ref().unwrap();
        assert_eq!(record.get(CanonicalField::MemoryGb), &Value::Null);
        assert_eq!(record.diagnostics.len(), 1);
        assert_eq!(record.diagnostics[0].field, "memory_gb");
    }

    #[test]
    fn test_fail_record_policy() {
        let n = normalizer(FieldErrorPolicy::FailRecord);
        let out = n
            .normalize_at(
                "team_b",
                &[
                    json!({"OperatingSystem": "Debian", "CPU": "i7", "RAM": "lots"}),
                    json!({"OperatingSystem": "Debian", "RAM": "16 GB"}),
                    json!({"OperatingSystem": "Debian", "CPU": "i7"}),
                ],
                at(),
            )
            .unwrap();
        assert!(matches!(out[0], Err(RecordError::ConversionFailed { index: 0, .. })));
        assert_eq!(
            out[1],
            Err(RecordError::MissingRequired {
                index: 1,
                field: "cpu".to_string()
            })
        );
        assert!(out[2].is_ok());
    }

    #[test]
    fn test_empty_record_is_rejected() {
        let n = normalizer(FieldErrorPolicy::NullField);
        let out = n.normalize_at("team_a", &[json!({"unrelated": 1}), json!({"os": null})], at()).unwrap();
        assert!(matches!(out[0], Err(RecordError::NoFieldsResolved { index: 0, .. })));
        assert!(matches!(out[1], Err(RecordError::NoFieldsResolved { index: 1, .. })));
    }

    #[test]
    fn test_batch_independence_and_order() {
        let n = normalizer(FieldErrorPolicy::NullField);
        let batch = vec![
            json!({"os": "a", "cpu": "1"}),
            json!("not an object"),
            json!({"os": "c", "cpu": "3", "memory": "bad"}),
            json!({"os": "d", "cpu": "4"}),
        ];
        let out = n.normalize_at("team_a", &batch, at()).unwrap();
        assert_eq!(out.len(), 4);
        assert_eq!(out[0].as_ref().unwrap().get(CanonicalField::Os), &json!("a"));
        assert_eq!(out[1], Err(RecordError::NotAnObject { index: 1 }));
        assert_eq!(out[2].as_ref().unwrap().diagnostics.len(), 1);
        assert_eq!(out[3].as_ref().unwrap().get(CanonicalField::Os), &json!("d"));
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let n = normalizer(FieldErrorPolicy::NullField);
        let raw = [json!({"os": "Ubuntu", "cpu": "Xeon", "memory": 16})];
        let first = serde_json::to_vec(n.normalize_at("team_a", &raw, at()).unwrap()[0].as_ref().unwrap()).unwrap();
        let second = serde_json::to_vec(n.normalize_at("team_a", &raw, at()).unwrap()[0].as_ref().unwrap()).unwrap();
        assert_eq!(first, second);
    }
}
