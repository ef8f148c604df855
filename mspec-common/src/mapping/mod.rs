//! Field-mapping normalization engine
//!
//! Translates per-source raw JSON records into the canonical schema:
//! - [`transform`]: closed vocabulary of value conversions
//! - [`loader`]: mapping documents, parsing and validation
//! - [`store`]: atomically swapped configuration snapshots
//! - [`resolver`]: candidate-name resolution for a single field
//! - [`normalizer`]: batch orchestration with per-record outcomes

pub mod error;
pub mod loader;
pub mod model;
pub mod normalizer;
pub mod resolver;
pub mod store;
pub mod transform;

pub use error::{ConfigError, ConversionError, RecordError, TransformError, ValidationIssue};
pub use loader::{parse_document, FileSource, MappingSource, StaticSource};
pub use model::{FieldSpec, MappingConfig};
pub use normalizer::{FieldErrorPolicy, NormalizedRecord, Normalizer, RecordOutcome};
pub use resolver::{resolve, ResolvedField};
pub use store::{MappingSnapshot, MappingStore};
pub use transform::{evaluate, Conversion, Transform};
