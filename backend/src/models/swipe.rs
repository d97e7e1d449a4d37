use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::matches::Match;
use crate::models::profile::CandidateView;
use crate::models::quota::{QuotaDenial, QuotaKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "swipe_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SwipeKind {
    Pass,
    Like,
    SuperLike,
}

impl SwipeKind {
    /// The quota counter this kind draws from. PASS is unlimited and untracked.
    pub fn quota_kind(&self) -> Option<QuotaKind> {
        match self {
            SwipeKind::Pass => None,
            SwipeKind::Like => Some(QuotaKind::Like),
            SwipeKind::SuperLike => Some(QuotaKind::SuperLike),
        }
    }

    pub fn expresses_interest(&self) -> bool {
        matches!(self, SwipeKind::Like | SwipeKind::SuperLike)
    }
}

/// One immutable swipe decision. At most one exists per (actor, target).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SwipeDecision {
    pub actor_id: String,
    pub target_id: String,
    pub kind: SwipeKind,
    pub created_at: DateTime<Utc>,
}

impl SwipeDecision {
    pub fn new(actor_id: impl Into<String>, target_id: impl Into<String>, kind: SwipeKind) -> Self {
        Self {
            actor_id: actor_id.into(),
            target_id: target_id.into(),
            kind,
            created_at: Utc::now(),
        }
    }
}

/// Outcome of submitting a swipe. Policy outcomes (`QuotaExceeded`,
/// `AlreadySwiped`) are routine results, not errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum SwipeOutcome {
    Recorded,
    MatchFormed(Match),
    QuotaExceeded(QuotaDenial),
    AlreadySwiped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum DiscoveryOutcome {
    Candidate(CandidateView),
    Exhausted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum RewindOutcome {
    Candidate(CandidateView),
    NoHistory,
}
