//! mspec-ingest library - machine-spec ingestion service
//!
//! Hosts the mapping engine behind HTTP: raw records are normalized per
//! source and stored; stored records can be listed and summarized; mapping
//! configuration can be inspected and reloaded.

use axum::http::HeaderValue;
use axum::Router;
use mspec_common::mapping::Normalizer;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

pub mod api;
pub mod db;
pub mod pagination;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Mapping engine bound to the process-wide mapping store
    pub normalizer: Arc<Normalizer>,
    /// Upper bound on records per page for list queries
    pub max_page_size: i64,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, normalizer: Arc<Normalizer>, max_page_size: i64) -> Self {
        Self {
            db,
            normalizer,
            max_page_size,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState, cors_origins: &[String]) -> Router {
    use axum::routing::{get, post};

    Router::new()
        .route("/machines", post(api::post_machines).get(api::get_machines))
        .route("/machines/sources", get(api::get_sources))
        .route("/stats", get(api::get_stats))
        .route("/mappings", get(api::list_mappings))
        .route("/mappings/reload", post(api::reload_mappings))
        .route("/mappings/:source_id", get(api::get_mapping))
        .merge(api::health_routes())
        .with_state(state)
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
}

/// CORS for the configured origins; an empty list disables cross-origin access
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(Any)
        .allow_headers(Any)
}
