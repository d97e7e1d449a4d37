use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;

use crate::handlers::{AppState, ErrorBody, error_response};
use crate::models::QuotaSnapshot;

pub async fn current_quota(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<QuotaSnapshot>, (StatusCode, Json<ErrorBody>)> {
    state
        .engine
        .current_quota(&user_id)
        .await
        .map(Json)
        .map_err(error_response)
}
