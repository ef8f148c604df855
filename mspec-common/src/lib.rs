//! # mspec Common Library
//!
//! Shared code for the machine-spec services:
//! - Canonical schema of normalized machine fields
//! - Mapping engine (transforms, configuration store, resolver, normalizer)
//! - Bootstrap configuration loading
//! - Common error types

pub mod config;
pub mod error;
pub mod mapping;
pub mod schema;

pub use error::{Error, Result};
pub use schema::CanonicalField;
