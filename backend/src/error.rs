use thiserror::Error;

/// Failures the engine surfaces to callers. Policy outcomes such as
/// `QuotaExceeded` or `AlreadySwiped` are not errors; they are variants of
/// [`crate::models::SwipeOutcome`].
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("unknown user: {0}")]
    UnknownUser(String),

    #[error("cannot swipe on yourself")]
    SelfSwipe,

    #[error("invalid discovery filters: {0}")]
    InvalidFilters(String),

    #[error("storage failure: {0}")]
    Storage(#[source] anyhow::Error),
}
