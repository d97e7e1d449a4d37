use anyhow::Result;
use chrono::NaiveDate;
use sqlx::PgPool;

use crate::models::QuotaKind;
use crate::store::{ConsumeOutcome, QuotaStore};

#[derive(Debug, Clone)]
pub struct PgQuotaStore {
    pool: PgPool,
}

impl PgQuotaStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl QuotaStore for PgQuotaStore {
    async fn try_consume(
        &self,
        user_id: &str,
        kind: QuotaKind,
        day_bucket: NaiveDate,
        limit: Option<i64>,
    ) -> Result<ConsumeOutcome> {
        // Single-statement increment-and-compare: the conditional upsert
        // either bumps the counter and returns the new value, or touches
        // nothing. Two racing calls on the last slot serialize on the row.
        let used: Option<i32> = match limit {
            Some(limit) => {
                sqlx::query_scalar(
                    r#"
                    INSERT INTO quota_counters (user_id, kind, day_bucket, used)
                    VALUES ($1, $2, $3, 1)
                    ON CONFLICT (user_id, kind, day_bucket)
                    DO UPDATE SET used = quota_counters.used + 1
                    WHERE quota_counters.used < $4
                    RETURNING used
                    "#,
                )
                .bind(user_id)
                .bind(kind)
                .bind(day_bucket)
                .bind(limit)
                .fetch_optional(&self.pool)
                .await?
            }
            None => {
                sqlx::query_scalar(
                    r#"
                    INSERT INTO quota_counters (user_id, kind, day_bucket, used)
                    VALUES ($1, $2, $3, 1)
                    ON CONFLICT (user_id, kind, day_bucket)
                    DO UPDATE SET used = quota_counters.used + 1
                    RETURNING used
                    "#,
                )
                .bind(user_id)
                .bind(kind)
                .bind(day_bucket)
                .fetch_optional(&self.pool)
                .await?
            }
        };

        match used {
            Some(used) => Ok(ConsumeOutcome::Allowed { used: used as i64 }),
            None => Ok(ConsumeOutcome::Denied),
        }
    }

    async fn refund(&self, user_id: &str, kind: QuotaKind, day_bucket: NaiveDate) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE quota_counters
            SET used = GREATEST(used - 1, 0)
            WHERE user_id = $1 AND kind = $2 AND day_bucket = $3
            "#,
        )
        .bind(user_id)
        .bind(kind)
        .bind(day_bucket)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn used(&self, user_id: &str, kind: QuotaKind, day_bucket: NaiveDate) -> Result<i64> {
        let used: Option<i32> = sqlx::query_scalar(
            r#"
            SELECT used
            FROM quota_counters
            WHERE user_id = $1 AND kind = $2 AND day_bucket = $3
            "#,
        )
        .bind(user_id)
        .bind(kind)
        .bind(day_bucket)
        .fetch_optional(&self.pool)
        .await?;

        Ok(used.unwrap_or(0) as i64)
    }
}
