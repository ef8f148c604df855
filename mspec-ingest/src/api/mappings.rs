//! Mapping configuration management
//!
//! Reads always go through one snapshot; a reload that fails validation
//! answers 422 with every issue while the previous mapping keeps serving.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use mspec_common::mapping::MappingConfig;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use super::ApiError;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct MappingsResponse {
    pub version: u64,
    pub loaded_at: DateTime<Utc>,
    pub origin: String,
    pub sources: Vec<String>,
}

/// GET /mappings
pub async fn list_mappings(State(state): State<AppState>) -> Json<MappingsResponse> {
    let snapshot = state.normalizer.store().snapshot();
    Json(MappingsResponse {
        version: snapshot.version(),
        loaded_at: snapshot.loaded_at(),
        origin: snapshot.origin().to_string(),
        sources: snapshot.source_ids().into_iter().collect(),
    })
}

/// GET /mappings/:source_id
pub async fn get_mapping(
    State(state): State<AppState>,
    Path(source_id): Path<String>,
) -> Result<Json<MappingConfig>, ApiError> {
    state
        .normalizer
        .store()
        .get(&source_id)
        .map(|mapping| Json(MappingConfig::clone(&mapping)))
        .map_err(|_| ApiError::NotFound(format!("No mapping for source '{}'", source_id)))
}

/// POST /mappings/reload
pub async fn reload_mappings(State(state): State<AppState>) -> Result<Json<MappingsResponse>, ApiError> {
    let store = Arc::clone(state.normalizer.store());

    // Reading the mapping source is blocking I/O
    let snapshot = tokio::task::spawn_blocking(move || store.reload())
        .await
        .map_err(|e| ApiError::Internal(e.into()))?
        .map_err(ApiError::ReloadRejected)?;

    info!("Mapping configuration v{} active", snapshot.version());
    Ok(Json(MappingsResponse {
        version: snapshot.version(),
        loaded_at: snapshot.loaded_at(),
        origin: snapshot.origin().to_string(),
        sources: snapshot.source_ids().into_iter().collect(),
    }))
}
