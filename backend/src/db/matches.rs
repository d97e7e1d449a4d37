use anyhow::{Result, anyhow};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Match, PairKey};
use crate::store::MatchStore;

#[derive(Debug, Clone)]
pub struct PgMatchStore {
    pool: PgPool,
}

impl PgMatchStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl MatchStore for PgMatchStore {
    async fn create(&self, pair: &PairKey) -> Result<(Match, bool)> {
        // Compare-and-create on the (user_a, user_b) unique key. The loser of
        // a concurrent double-trigger gets no row back and reads the winner's.
        let created = sqlx::query_as::<_, Match>(
            r#"
            INSERT INTO matches (id, user_a, user_b)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_a, user_b) DO NOTHING
            RETURNING id, user_a, user_b, conversation_id, formed_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(pair.a())
        .bind(pair.b())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(m) = created {
            return Ok((m, true));
        }

        let existing = self
            .find(pair)
            .await?
            .ok_or_else(|| anyhow!("match for pair ({}, {}) vanished after conflict", pair.a(), pair.b()))?;
        Ok((existing, false))
    }

    async fn find(&self, pair: &PairKey) -> Result<Option<Match>> {
        let m = sqlx::query_as::<_, Match>(
            r#"
            SELECT id, user_a, user_b, conversation_id, formed_at
            FROM matches
            WHERE user_a = $1 AND user_b = $2
            "#,
        )
        .bind(pair.a())
        .bind(pair.b())
        .fetch_optional(&self.pool)
        .await?;

        Ok(m)
    }

    async fn matched_user_ids(&self, user_id: &str) -> Result<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>(
            r#"
            SELECT user_b FROM matches WHERE user_a = $1
            UNION
            SELECT user_a FROM matches WHERE user_b = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn set_conversation(&self, pair: &PairKey, conversation_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE matches
            SET conversation_id = $3
            WHERE user_a = $1 AND user_b = $2 AND conversation_id IS NULL
            "#,
        )
        .bind(pair.a())
        .bind(pair.b())
        .bind(conversation_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn without_conversation(&self, limit: i64) -> Result<Vec<Match>> {
        let pending = sqlx::query_as::<_, Match>(
            r#"
            SELECT id, user_a, user_b, conversation_id, formed_at
            FROM matches
            WHERE conversation_id IS NULL
            ORDER BY formed_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(pending)
    }
}
