//! Readiness of the ingestion service
//!
//! `GET /health` reports whether the database answers and which mapping
//! snapshot is active. The service is ready only when both hold; otherwise
//! the same body comes back with 503.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use tracing::warn;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub module: &'static str,
    pub version: &'static str,
    pub database: bool,
    /// Active mapping snapshot; 0 means nothing loaded yet
    pub mapping_version: u64,
    pub mapping_sources: usize,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => true,
        Err(e) => {
            warn!("Health check: database unreachable: {}", e);
            false
        }
    };
    let snapshot = state.normalizer.store().snapshot();
    let ready = database && !snapshot.is_empty();

    let code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (
        code,
        Json(HealthResponse {
            status: if ready { "ok" } else { "degraded" },
            module: "mspec-ingest",
            version: env!("CARGO_PKG_VERSION"),
            database,
            mapping_version: snapshot.version(),
            mapping_sources: snapshot.len(),
        }),
    )
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
