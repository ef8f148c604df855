//! Error taxonomy of the mapping engine
//!
//! - [`ConfigError`] is fatal to the call that triggered it
//! - [`ValidationIssue`] values are aggregated across a whole document
//! - [`ConversionError`] is recovered per field
//! - [`RecordError`] is reported per record in a batch

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// A transform could not be parsed or could not be applied to a value
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{transform}: {reason}")]
pub struct TransformError {
    pub transform: String,
    pub reason: String,
}

impl TransformError {
    pub fn new(transform: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            transform: transform.into(),
            reason: reason.into(),
        }
    }
}

/// A field's conversion failed on the matched raw value
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[error("conversion of '{field}' (from '{candidate}') failed: {reason}")]
pub struct ConversionError {
    /// Normalized field name
    pub field: String,
    /// Raw key the value was taken from
    pub candidate: String,
    pub reason: String,
}

/// One structural problem found while validating a mapping document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
}

impl ValidationIssue {
    pub fn document(message: impl Into<String>) -> Self {
        Self {
            source_id: None,
            field: None,
            message: message.into(),
        }
    }

    pub fn source(source_id: &str, message: impl Into<String>) -> Self {
        Self {
            source_id: Some(source_id.to_string()),
            field: None,
            message: message.into(),
        }
    }

    pub fn field(source_id: &str, field: &str, message: impl Into<String>) -> Self {
        Self {
            source_id: Some(source_id.to_string()),
            field: Some(field.to_string()),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.source_id, &self.field) {
            (Some(source), Some(field)) => write!(f, "[{}.{}] {}", source, field, self.message),
            (Some(source), None) => write!(f, "[{}] {}", source, self.message),
            _ => write!(f, "[document] {}", self.message),
        }
    }
}

/// Configuration could not be loaded, or a source is not configured
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("unknown source '{source_id}' (configured sources: [{}])", .known.join(", "))]
    UnknownSource { source_id: String, known: Vec<String> },

    #[error("failed to read mapping configuration from {origin}: {reason}")]
    Read { origin: String, reason: String },

    #[error("failed to parse mapping configuration from {origin}: {reason}")]
    Parse { origin: String, reason: String },

    #[error("mapping configuration from {origin} rejected with {} issue(s)", .issues.len())]
    Invalid {
        origin: String,
        issues: Vec<ValidationIssue>,
    },
}

impl ConfigError {
    /// Validation issues carried by this error (empty for non-validation errors)
    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            ConfigError::Invalid { issues, .. } => issues,
            _ => &[],
        }
    }
}

/// A batch item could not be turned into a normalized record
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordError {
    #[error("Item {index} is not a valid JSON object")]
    NotAnObject { index: usize },

    #[error("Item {index} resolved no fields")]
    NoFieldsResolved {
        index: usize,
        diagnostics: Vec<ConversionError>,
    },

    #[error("Item {index}: {error}")]
    ConversionFailed { index: usize, error: ConversionError },

    #[error("Item {index} is missing required field '{field}'")]
    MissingRequired { index: usize, field: String },
}

impl RecordError {
    /// Position of the failed item in its batch
    pub fn index(&self) -> usize {
        match self {
            RecordError::NotAnObject { index }
            | RecordError::NoFieldsResolved { index, .. }
            | RecordError::ConversionFailed { index, .. }
            | RecordError::MissingRequired { index, .. } => *index,
        }
    }
}
