use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Canonical unordered pair of user ids: `a` is always the lexicographically
/// smaller id, so formation triggered from either side converges on one key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PairKey {
    a: String,
    b: String,
}

impl PairKey {
    pub fn new(x: impl Into<String>, y: impl Into<String>) -> Self {
        let (x, y) = (x.into(), y.into());
        if x <= y { Self { a: x, b: y } } else { Self { a: y, b: x } }
    }

    pub fn a(&self) -> &str {
        &self.a
    }

    pub fn b(&self) -> &str {
        &self.b
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.a == user_id || self.b == user_id
    }
}

/// The terminal artifact of two reciprocal like decisions. Created once,
/// never mutated apart from the conversation id backfill.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Match {
    pub id: Uuid,
    pub user_a: String,
    pub user_b: String,
    pub conversation_id: Option<Uuid>,
    pub formed_at: DateTime<Utc>,
}

impl Match {
    pub fn pair_key(&self) -> PairKey {
        PairKey::new(self.user_a.clone(), self.user_b.clone())
    }
}
