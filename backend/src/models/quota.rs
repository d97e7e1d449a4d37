use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "quota_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum QuotaKind {
    Like,
    SuperLike,
}

/// Why a like/super-like was denied. Closed set so callers can exhaustively
/// pick the right upsell message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaDenial {
    LikesExhausted,
    SuperLikesExhausted,
}

impl QuotaKind {
    pub fn denial(&self) -> QuotaDenial {
        match self {
            QuotaKind::Like => QuotaDenial::LikesExhausted,
            QuotaKind::SuperLike => QuotaDenial::SuperLikesExhausted,
        }
    }
}

/// Remaining allowance surfaced to the UI. `None` remaining = unlimited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaSnapshot {
    pub likes_remaining: Option<i64>,
    pub super_likes_remaining: Option<i64>,
    pub resets_at: DateTime<Utc>,
}
