//! Machine ingestion and listing
//!
//! `POST /machines` normalizes one object or an array of objects for the
//! source named in `X-Source`, storing each record that normalizes. Every
//! submitted item gets exactly one entry in `results`.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use mspec_common::mapping::ConfigError;
use mspec_common::CanonicalField;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use super::ApiError;
use crate::db::{self, MachineFilter, MachineRow};
use crate::pagination::{resolve_window, PageParams};
use crate::AppState;

/// Header naming the upstream source of an ingestion request
pub const SOURCE_HEADER: &str = "X-Source";

/// Per-item ingestion result
#[derive(Debug, Serialize)]
pub struct ItemResult {
    pub index: usize,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Conversion failures that were nulled out and values the store could not keep
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub status: String,
    pub inserted: usize,
    pub errors: Vec<String>,
    pub results: Vec<ItemResult>,
    pub message: String,
}

/// POST /machines
pub async fn post_machines(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<IngestResponse>, ApiError> {
    let store = state.normalizer.store();
    let source_id = headers
        .get(SOURCE_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .unwrap_or_default();
    let known = store.list_sources();
    if source_id.is_empty() || !known.contains(source_id) {
        return Err(ApiError::InvalidSource {
            known: known.into_iter().collect(),
        });
    }

    let payload: Value =
        serde_json::from_slice(&body).map_err(|_| ApiError::BadRequest("Invalid JSON payload".to_string()))?;
    let items = match payload {
        Value::Array(items) if !items.is_empty() => items,
        Value::Object(object) if !object.is_empty() => vec![Value::Object(object)],
        Value::Null | Value::Array(_) | Value::Object(_) => {
            return Err(ApiError::BadRequest("No data provided".to_string()));
        }
        scalar => vec![scalar],
    };

    let outcomes = state
        .normalizer
        .normalize(source_id, &items)
        .map_err(|err| match err {
            ConfigError::UnknownSource { known, .. } => ApiError::InvalidSource { known },
            other => ApiError::Internal(other.into()),
        })?;

    let mut inserted = 0;
    let mut errors = Vec::new();
    let mut results = Vec::with_capacity(outcomes.len());

    for (index, outcome) in outcomes.into_iter().enumerate() {
        let record = match outcome {
            Ok(record) => record,
            Err(err) => {
                errors.push(err.to_string());
                results.push(ItemResult {
                    index,
                    ok: false,
                    id: None,
                    error: Some(err.to_string()),
                    warnings: Vec::new(),
                });
                continue;
            }
        };

        let mut warnings: Vec<String> = record.diagnostics.iter().map(ToString::to_string).collect();
        let memory = record.get(CanonicalField::MemoryGb);
        if !memory.is_null() && memory.as_f64().is_none() {
            warnings.push(format!(
                "{} value {} is not numeric and was stored as null",
                CanonicalField::MemoryGb,
                memory
            ));
        }
        match db::insert_machine(&state.db, &record).await {
            Ok(id) => {
                inserted += 1;
                results.push(ItemResult {
                    index,
                    ok: true,
                    id: Some(id),
                    error: None,
                    warnings,
                });
            }
            Err(err) => {
                warn!("Failed to store item {} from '{}': {:#}", index, source_id, err);
                let message = format!("Item {}: failed to store record", index);
                errors.push(message.clone());
                results.push(ItemResult {
                    index,
                    ok: false,
                    id: None,
                    error: Some(message),
                    warnings,
                });
            }
        }
    }

    info!(
        "Ingested {} of {} item(s) from source '{}'",
        inserted,
        results.len(),
        source_id
    );

    Ok(Json(IngestResponse {
        status: "success".to_string(),
        inserted,
        errors,
        results,
        message: format!("Inserted {} records", inserted),
    }))
}

/// Query parameters for `GET /machines`
#[derive(Debug, Default, Deserialize)]
pub struct MachinesQuery {
    pub os: Option<String>,
    pub cpu: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// GET /machines
pub async fn get_machines(
    State(state): State<AppState>,
    Query(query): Query<MachinesQuery>,
) -> Result<Json<Vec<MachineRow>>, ApiError> {
    let window = resolve_window(
        PageParams {
            limit: query.limit,
            offset: query.offset,
            page: query.page,
            per_page: query.per_page,
        },
        state.max_page_size,
    );
    let filter = MachineFilter {
        os: query.os.filter(|s| !s.is_empty()),
        cpu: query.cpu.filter(|s| !s.is_empty()),
    };

    let rows = db::list_machines(&state.db, &filter, window.limit, window.offset).await?;
    Ok(Json(rows))
}

#[derive(Debug, Serialize)]
pub struct SourcesResponse {
    /// Sources with stored records
    pub sources: Vec<String>,
    /// Sources with an active mapping
    pub mappings: Vec<String>,
}

/// GET /machines/sources
pub async fn get_sources(State(state): State<AppState>) -> Result<Json<SourcesResponse>, ApiError> {
    let sources = db::distinct_sources(&state.db).await?;
    let mappings = state.normalizer.store().list_sources().into_iter().collect();
    Ok(Json(SourcesResponse { sources, mappings }))
}
