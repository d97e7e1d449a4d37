use anyhow::Result;
use sqlx::PgPool;

use crate::models::SwipeDecision;
use crate::store::{RecordOutcome, SwipeStore};

#[derive(Debug, Clone)]
pub struct PgSwipeStore {
    pool: PgPool,
}

impl PgSwipeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl SwipeStore for PgSwipeStore {
    async fn record(&self, decision: &SwipeDecision) -> Result<RecordOutcome> {
        // The primary key on (actor_id, target_id) makes this the atomic
        // insert-if-absent; rows_affected 0 means a decision already exists.
        let result = sqlx::query(
            r#"
            INSERT INTO swipes (actor_id, target_id, kind, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (actor_id, target_id) DO NOTHING
            "#,
        )
        .bind(&decision.actor_id)
        .bind(&decision.target_id)
        .bind(decision.kind)
        .bind(decision.created_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            Ok(RecordOutcome::Inserted)
        } else {
            Ok(RecordOutcome::Duplicate)
        }
    }

    async fn find(&self, actor_id: &str, target_id: &str) -> Result<Option<SwipeDecision>> {
        let decision = sqlx::query_as::<_, SwipeDecision>(
            r#"
            SELECT actor_id, target_id, kind, created_at
            FROM swipes
            WHERE actor_id = $1 AND target_id = $2
            "#,
        )
        .bind(actor_id)
        .bind(target_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(decision)
    }

    async fn swiped_targets(&self, actor_id: &str) -> Result<Vec<String>> {
        let targets = sqlx::query_scalar::<_, String>(
            r#"
            SELECT target_id
            FROM swipes
            WHERE actor_id = $1
            "#,
        )
        .bind(actor_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(targets)
    }
}
