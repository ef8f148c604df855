//! HTTP API handlers for mspec-ingest

pub mod error;
pub mod health;
pub mod machines;
pub mod mappings;
pub mod stats;

pub use error::ApiError;
pub use health::health_routes;
pub use machines::{get_machines, get_sources, post_machines};
pub use mappings::{get_mapping, list_mappings, reload_mappings};
pub use stats::get_stats;
