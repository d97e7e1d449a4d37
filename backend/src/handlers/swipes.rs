use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;

use crate::handlers::{AppState, ErrorBody, error_response};
use crate::models::{SwipeKind, SwipeOutcome};

#[derive(Debug, Deserialize)]
pub struct SwipeRequest {
    pub actor_id: String,
    pub target_id: String,
    pub kind: SwipeKind,
}

pub async fn submit_swipe(
    State(state): State<AppState>,
    Json(req): Json<SwipeRequest>,
) -> Result<Json<SwipeOutcome>, (StatusCode, Json<ErrorBody>)> {
    state
        .engine
        .submit_swipe(&req.actor_id, &req.target_id, req.kind)
        .await
        .map(Json)
        .map_err(error_response)
}
