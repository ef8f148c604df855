//! Statistics endpoint

use axum::{extract::State, Json};

use super::ApiError;
use crate::db::{self, MachineStats};
use crate::AppState;

/// GET /stats
pub async fn get_stats(State(state): State<AppState>) -> Result<Json<MachineStats>, ApiError> {
    Ok(Json(db::machine_stats(&state.db).await?))
}
