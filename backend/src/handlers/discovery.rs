use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;

use crate::handlers::{AppState, ErrorBody, error_response};
use crate::models::{DiscoveryFilters, DiscoveryOutcome, RewindOutcome};

pub async fn discover_next(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<DiscoveryOutcome>, (StatusCode, Json<ErrorBody>)> {
    state
        .engine
        .discover_next(&user_id)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn rewind(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<RewindOutcome>, (StatusCode, Json<ErrorBody>)> {
    state
        .engine
        .undo_last_swipe(&user_id)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn set_filters(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(filters): Json<DiscoveryFilters>,
) -> Result<StatusCode, (StatusCode, Json<ErrorBody>)> {
    state
        .engine
        .set_filters(&user_id, filters)
        .await
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(error_response)
}
