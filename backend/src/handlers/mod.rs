pub mod discovery;
pub mod quota;
pub mod swipes;

pub use discovery::{discover_next, rewind, set_filters};
pub use quota::current_quota;
pub use swipes::submit_swipe;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::Json;
use serde::Serialize;

use crate::db::{PgMatchStore, PgProfilePool, PgQuotaStore, PgSwipeStore};
use crate::error::EngineError;
use crate::services::{ChatService, Engine, NotificationService};

pub type PgEngine = Engine<
    PgSwipeStore,
    PgMatchStore,
    PgQuotaStore,
    PgProfilePool,
    PgProfilePool,
    ChatService,
    NotificationService,
>;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<PgEngine>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

pub(crate) fn error_response(err: EngineError) -> (StatusCode, Json<ErrorBody>) {
    let status = match &err {
        EngineError::SelfSwipe | EngineError::InvalidFilters(_) => StatusCode::BAD_REQUEST,
        EngineError::UnknownUser(_) => StatusCode::NOT_FOUND,
        EngineError::Storage(cause) => {
            tracing::error!("storage failure: {cause:#}");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (
        status,
        Json(ErrorBody {
            error: err.to_string(),
        }),
    )
}
