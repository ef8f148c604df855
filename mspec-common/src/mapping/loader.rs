//! Mapping documents: where they come from and how they are validated
//!
//! A mapping document is keyed by source id. Each source lists, per
//! normalized field, the raw candidate names and an optional conversion:
//!
//! ```json
//! {
//!   "team_a": {
//!     "case_insensitive": true,
//!     "fields": {
//!       "os": {"candidates": ["os"]},
//!       "cpu": ["cpu_model", "cpu"],
//!       "memory_gb": {"candidates": ["mem_mb", "memory"], "conversion": "scale(1/1024)"}
//!     }
//!   },
//!   "team_b": {"os": "OperatingSystem", "cpu": "CPU"}
//! }
//! ```
//!
//! Validation walks the whole document and collects every problem before
//! rejecting it, so an operator can fix a file in one pass.

use super::error::{ConfigError, ValidationIssue};
use super::model::{FieldSpec, MappingConfig};
use super::transform::{type_name, Conversion};
use crate::schema::CanonicalField;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Source of mapping documents
///
/// `read` is the only blocking I/O in the mapping engine.
pub trait MappingSource: Send + Sync {
    /// Human-readable location, used in logs and errors
    fn origin(&self) -> String;

    /// Read and parse the raw document (structure is validated separately)
    fn read(&self) -> Result<Value, ConfigError>;
}

/// Mapping document on disk: TOML for `.toml` files, JSON otherwise
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_toml(&self) -> bool {
        self.path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"))
    }
}

impl MappingSource for FileSource {
    fn origin(&self) -> String {
        self.path.display().to_string()
    }

    fn read(&self) -> Result<Value, ConfigError> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::Read {
            origin: self.origin(),
            reason: e.to_string(),
        })?;

        let parsed = if self.is_toml() {
            toml::from_str::<Value>(&text).map_err(|e| e.to_string())
        } else {
            serde_json::from_str::<Value>(&text).map_err(|e| e.to_string())
        };

        parsed.map_err(|reason| ConfigError::Parse {
            origin: self.origin(),
            reason,
        })
    }
}

/// In-memory mapping document that can be replaced between loads
#[derive(Debug)]
pub struct StaticSource {
    document: RwLock<Value>,
}

impl StaticSource {
    pub fn new(document: Value) -> Self {
        Self {
            document: RwLock::new(document),
        }
    }

    /// Replace the document; takes effect on the next load
    pub fn replace(&self, document: Value) {
        let mut guard = self.document.write().unwrap_or_else(|e| e.into_inner());
        *guard = document;
    }
}

impl MappingSource for StaticSource {
    fn origin(&self) -> String {
        "<in-memory>".to_string()
    }

    fn read(&self) -> Result<Value, ConfigError> {
        let guard = self.document.read().unwrap_or_else(|e| e.into_inner());
        Ok(guard.clone())
    }
}

/// Validate a whole mapping document and build one [`MappingConfig`] per source
///
/// Returns every validation issue found, or the complete set of mappings.
pub fn parse_document(document: &Value) -> Result<BTreeMap<String, MappingConfig>, Vec<ValidationIssue>> {
    let Some(sources) = document.as_object() else {
        return Err(vec![ValidationIssue::document(format!(
            "expected an object keyed by source id, got {}",
            type_name(document)
        ))]);
    };

    let mut issues = Vec::new();
    let mut mappings = BTreeMap::new();

    for (source_id, body) in sources {
        if source_id.trim().is_empty() {
            issues.push(ValidationIssue::document("source id must not be empty"));
            continue;
        }
        if let Some(mapping) = parse_source(source_id, body, &mut issues) {
            mappings.insert(source_id.clone(), mapping);
        }
    }

    if issues.is_empty() {
        Ok(mappings)
    } else {
        Err(issues)
    }
}

fn parse_source(source_id: &str, body: &Value, issues: &mut Vec<ValidationIssue>) -> Option<MappingConfig> {
    let Some(object) = body.as_object() else {
        issues.push(ValidationIssue::source(
            source_id,
            format!("expected an object, got {}", type_name(body)),
        ));
        return None;
    };

    let before = issues.len();

    // Options live beside a "fields" table; without one the object lists fields directly
    let (fields, case_insensitive) = match object.get("fields") {
        Some(Value::Object(fields)) => {
            let case_insensitive = read_flag(object, "case_insensitive", source_id, None, issues).unwrap_or(false);
            for key in object.keys().filter(|k| *k != "fields" && *k != "case_insensitive") {
                issues.push(ValidationIssue::source(source_id, format!("unknown option '{}'", key)));
            }
            (fields, case_insensitive)
        }
        Some(other) => {
            issues.push(ValidationIssue::source(
                source_id,
                format!("'fields' must be an object, got {}", type_name(other)),
            ));
            return None;
        }
        None => (object, false),
    };

    let mut mapping = MappingConfig::new(source_id);
    for (name, spec) in fields {
        let Some(field) = CanonicalField::from_name(name) else {
            issues.push(ValidationIssue::field(
                source_id,
                name,
                format!(
                    "unknown normalized field (expected one of: {})",
                    CanonicalField::names().join(", ")
                ),
            ));
            continue;
        };
        if let Some(spec) = parse_field(source_id, field, spec, case_insensitive, issues) {
            mapping.fields.insert(field, spec);
        }
    }

    for field in CanonicalField::ALL.into_iter().filter(|f| f.is_required()) {
        if !fields.contains_key(field.name()) {
            issues.push(ValidationIssue::field(source_id, field.name(), "required field is not mapped"));
        }
    }

    (issues.len() == before).then_some(mapping)
}

fn parse_field(
    source_id: &str,
    field: CanonicalField,
    spec: &Value,
    source_case_insensitive: bool,
    issues: &mut Vec<ValidationIssue>,
) -> Option<FieldSpec> {
    let name = field.name();
    let before = issues.len();

    let (candidates_value, conversion_value, case_insensitive) = match spec {
        Value::String(_) | Value::Array(_) => (Some(spec), None, source_case_insensitive),
        Value::Object(object) => {
            for key in object.keys() {
                if !matches!(key.as_str(), "candidates" | "conversion" | "case_insensitive") {
                    issues.push(ValidationIssue::field(source_id, name, format!("unknown key '{}'", key)));
                }
            }
            let case_insensitive = read_flag(object, "case_insensitive", source_id, Some(name), issues)
                .unwrap_or(source_case_insensitive);
            (object.get("candidates"), object.get("conversion"), case_insensitive)
        }
        other => {
            issues.push(ValidationIssue::field(
                source_id,
                name,
                format!("expected a candidate list or an object, got {}", type_name(other)),
            ));
            return None;
        }
    };

    let candidates = parse_candidates(source_id, name, candidates_value, issues);

    let conversion = match conversion_value {
        None | Some(Value::Null) => None,
        Some(Value::String(expression)) => match Conversion::parse(expression) {
            Ok(conversion) => Some(conversion),
            Err(e) => {
                issues.push(ValidationIssue::field(source_id, name, format!("invalid conversion: {}", e)));
                None
            }
        },
        Some(other) => {
            issues.push(ValidationIssue::field(
                source_id,
                name,
                format!("conversion must be a string, got {}", type_name(other)),
            ));
            None
        }
    };

    if issues.len() != before {
        return None;
    }

    let mut spec = FieldSpec::new(field, candidates).case_insensitive(case_insensitive);
    spec.conversion = conversion;
    Some(spec)
}

fn parse_candidates(
    source_id: &str,
    name: &str,
    value: Option<&Value>,
    issues: &mut Vec<ValidationIssue>,
) -> Vec<String> {
    let items: Vec<&Value> = match value {
        Some(Value::String(_)) => value.into_iter().collect(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(other) => {
            issues.push(ValidationIssue::field(
                source_id,
                name,
                format!("candidates must be a string or a list, got {}", type_name(other)),
            ));
            return Vec::new();
        }
        None => {
            issues.push(ValidationIssue::field(source_id, name, "missing 'candidates'"));
            return Vec::new();
        }
    };

    if items.is_empty() {
        issues.push(ValidationIssue::field(source_id, name, "candidate list is empty"));
        return Vec::new();
    }

    let mut seen = HashSet::new();
    let mut candidates = Vec::with_capacity(items.len());
    for item in items {
        match item.as_str() {
            Some(candidate) if candidate.is_empty() => {
                issues.push(ValidationIssue::field(source_id, name, "candidate names must not be empty"));
            }
            Some(candidate) if !seen.insert(candidate) => {
                issues.push(ValidationIssue::field(
                    source_id,
                    name,
                    format!("duplicate candidate '{}'", candidate),
                ));
            }
            Some(candidate) => candidates.push(candidate.to_string()),
            None => issues.push(ValidationIssue::field(
                source_id,
                name,
                format!("candidate names must be strings, got {}", type_name(item)),
            )),
        }
    }
    candidates
}

fn read_flag(
    object: &Map<String, Value>,
    key: &str,
    source_id: &str,
    field: Option<&str>,
    issues: &mut Vec<ValidationIssue>,
) -> Option<bool> {
    match object.get(key)? {
        Value::Bool(flag) => Some(*flag),
        other => {
            let message = format!("'{}' must be a boolean, got {}", key, type_name(other));
            issues.push(match field {
                Some(field) => ValidationIssue::field(source_id, field, message),
                None => ValidationIssue::source(source_id, message),
            });
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_parses_full_and_shorthand_forms() {
        let doc = json!({
            "team_a": {
                "case_insensitive": true,
                "fields": {
                    "os": {"candidates": ["os"]},
                    "cpu": ["cpu_model", "cpu"],
                    "memory_gb": {"candidates": ["mem_mb", "memory"], "conversion": "scale(1/1024)"}
                }
            },
            "team_b": {"os": "OperatingSystem", "cpu": "CPU"}
        });

        let mappings = parse_document(&doc).unwrap();
        assert_eq!(mappings.len(), 2);

        let team_a = &mappings["team_a"];
        let cpu = team_a.field(CanonicalField::Cpu).unwrap();
        assert_eq!(cpu.candidates, vec!["cpu_model", "cpu"]);
        assert!(cpu.case_insensitive);
        let memory = team_a.field(CanonicalField::MemoryGb).unwrap();
        assert_eq!(memory.conversion.as_ref().unwrap().expression(), "scale(1/1024)");

        let team_b = &mappings["team_b"];
        assert_eq!(team_b.field(CanonicalField::Os).unwrap().candidates, vec!["OperatingSystem"]);
        assert!(!team_b.field(CanonicalField::Os).unwrap().case_insensitive);
        assert!(team_b.field(CanonicalField::MemoryGb).is_none());
    }

    #[test]
    fn test_field_overrides_source_case_flag() {
        let doc = json!({
            "s": {
                "case_insensitive": true,
                "fields": {
                    "os": {"candidates": ["os"], "case_insensitive": false},
                    "cpu": ["cpu"]
                }
            }
        });
        let mappings = parse_document(&doc).unwrap();
        assert!(!mappings["s"].field(CanonicalField::Os).unwrap().case_insensitive);
        assert!(mappings["s"].field(CanonicalField::Cpu).unwrap().case_insensitive);
    }

    #[test]
    fn test_issues_are_aggregated_across_document() {
        let doc = json!({
            "team_a": {"os": [], "cpu": ["cpu"], "memory_gb": {"candidates": ["mem"], "conversion": "eval(1)"}},
            "team_b": {"os": ["os"], "gpu": ["gpu"]},
            "team_c": 5
        });

        let issues = parse_document(&doc).unwrap_err();
        let rendered: Vec<String> = issues.iter().map(ToString::to_string).collect();

        assert!(rendered.contains(&"[team_a.os] candidate list is empty".to_string()));
        assert!(rendered.iter().any(|i| i.starts_with("[team_a.memory_gb] invalid conversion")));
        assert!(rendered.iter().any(|i| i.starts_with("[team_b.gpu] unknown normalized field")));
        assert!(rendered.contains(&"[team_b.cpu] required field is not mapped".to_string()));
        assert!(rendered.contains(&"[team_c] expected an object, got number".to_string()));
        assert_eq!(issues.len(), 5);
    }

    #[test]
    fn test_rejects_bad_candidates() {
        let doc = json!({"s": {"os": ["os", "os", ""], "cpu": [1]}});
        let issues = parse_document(&doc).unwrap_err();
        assert_eq!(issues.len(), 3);
    }

    #[test]
    fn test_rejects_non_object_document() {
        let issues = parse_document(&json!(["team_a"])).unwrap_err();
        assert_eq!(issues, vec![ValidationIssue::document("expected an object keyed by source id, got array")]);
    }

    #[test]
    fn test_file_source_reads_json_and_toml() {
        let mut json_file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(json_file, r#"{{"s": {{"os": "os", "cpu": "cpu"}}}}"#).unwrap();
        let doc = FileSource::new(json_file.path()).read().unwrap();
        assert!(parse_document(&doc).is_ok());

        let mut toml_file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            toml_file,
            "[s]\nos = \"os\"\ncpu = [\"cpu\"]\n\n[s.memory_gb]\ncandidates = [\"mem\"]\nconversion = \"scale(1/1024)\"\n"
        )
        .unwrap();
        let doc = FileSource::new(toml_file.path()).read().unwrap();
        let mappings = parse_document(&doc).unwrap();
        assert!(mappings["s"].field(CanonicalField::MemoryGb).unwrap().conversion.is_some());
    }

    #[test]
    fn test_file_source_errors() {
        let missing = FileSource::new("/nonexistent/mappings.json");
        assert!(matches!(missing.read(), Err(ConfigError::Read { .. })));

        let mut bad = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(bad, "{{not json").unwrap();
        assert!(matches!(FileSource::new(bad.path()).read(), Err(ConfigError::Parse { .. })));
    }
}
