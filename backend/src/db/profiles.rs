use anyhow::Result;
use sqlx::PgPool;

use crate::models::{Profile, SubscriptionTier};
use crate::store::{FetchCriteria, ProfilePool, SubscriptionStatus};

const PROFILE_COLUMNS: &str = "user_id, display_name, age, latitude, longitude, interests, \
     intention, smoking, drinking, children, religion, height_cm, photo_count, verified, \
     tier, last_active_at, created_at";

/// Read-only view over the externally owned profile records. Also answers
/// tier lookups, since the billing service mirrors the tier onto the row.
#[derive(Debug, Clone)]
pub struct PgProfilePool {
    pool: PgPool,
}

impl PgProfilePool {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ProfilePool for PgProfilePool {
    async fn get(&self, user_id: &str) -> Result<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn fetch_page(
        &self,
        criteria: &FetchCriteria,
        page_token: Option<i64>,
        limit: i64,
    ) -> Result<(Vec<Profile>, Option<i64>)> {
        let offset = page_token.unwrap_or(0).max(0);
        let page = sqlx::query_as::<_, Profile>(&format!(
            r#"
            SELECT {PROFILE_COLUMNS}
            FROM profiles
            WHERE age >= $1 AND age <= $2
            ORDER BY last_active_at DESC, user_id ASC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(criteria.min_age)
        .bind(criteria.max_age)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let next = if page.len() == limit as usize {
            Some(offset + limit)
        } else {
            None
        };
        Ok((page, next))
    }
}

impl SubscriptionStatus for PgProfilePool {
    async fn tier_of(&self, user_id: &str) -> Result<Option<SubscriptionTier>> {
        let tier = sqlx::query_scalar::<_, SubscriptionTier>(
            "SELECT tier FROM profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(tier)
    }
}
