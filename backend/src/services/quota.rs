//! Daily usage quotas per subscription tier. The ledger owns the day-bucket
//! policy and delegates the atomic increment-and-compare to the store.

use anyhow::Result;
use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeDelta, Utc};
use chrono_tz::Tz;

use crate::models::{QuotaDenial, QuotaKind, QuotaSnapshot, SubscriptionTier};
use crate::store::{ConsumeOutcome, QuotaStore};

/// Day-bucket policy: quota days are calendar days in one server-configured
/// timezone. `QUOTA_TIMEZONE` in the environment, UTC by default.
#[derive(Debug, Clone, Copy)]
pub struct QuotaPolicy {
    tz: Tz,
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self { tz: chrono_tz::UTC }
    }
}

impl QuotaPolicy {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn day_bucket(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.tz).date_naive()
    }

    /// Next local midnight, in UTC. DST gaps fall back to a flat 24h step.
    pub fn resets_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let next_day = self.day_bucket(now) + Days::new(1);
        let midnight = next_day.and_time(NaiveTime::MIN);
        midnight
            .and_local_timezone(self.tz)
            .earliest()
            .map(|dt| dt.to_utc())
            .unwrap_or_else(|| now + TimeDelta::days(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerOutcome {
    Allowed { remaining: Option<i64> },
    Denied(QuotaDenial),
}

#[derive(Debug, Clone)]
pub struct QuotaLedger<Q> {
    store: Q,
    policy: QuotaPolicy,
}

impl<Q: QuotaStore> QuotaLedger<Q> {
    pub fn new(store: Q, policy: QuotaPolicy) -> Self {
        Self { store, policy }
    }

    /// Consume one unit of `kind` for today. The counter is durably
    /// incremented before `Allowed` is returned, so a retried client call can
    /// never sneak past the limit.
    pub async fn try_consume(
        &self,
        user_id: &str,
        kind: QuotaKind,
        tier: SubscriptionTier,
    ) -> Result<LedgerOutcome> {
        let limit = tier.daily_limit(kind);
        if limit == Some(0) {
            return Ok(LedgerOutcome::Denied(kind.denial()));
        }

        let day = self.policy.day_bucket(Utc::now());
        match self.store.try_consume(user_id, kind, day, limit).await? {
            ConsumeOutcome::Allowed { used } => Ok(LedgerOutcome::Allowed {
                remaining: limit.map(|l| (l - used).max(0)),
            }),
            ConsumeOutcome::Denied => Ok(LedgerOutcome::Denied(kind.denial())),
        }
    }

    /// Hand back one unit consumed for a swipe that never got recorded.
    pub async fn refund(&self, user_id: &str, kind: QuotaKind) -> Result<()> {
        let day = self.policy.day_bucket(Utc::now());
        self.store.refund(user_id, kind, day).await
    }

    /// Remaining allowance for the UI.
    pub async fn snapshot(&self, user_id: &str, tier: SubscriptionTier) -> Result<QuotaSnapshot> {
        let now = Utc::now();
        let day = self.policy.day_bucket(now);

        let likes_remaining = match tier.daily_limit(QuotaKind::Like) {
            Some(limit) => {
                let used = self.store.used(user_id, QuotaKind::Like, day).await?;
                Some((limit - used).max(0))
            }
            None => None,
        };
        let super_likes_remaining = match tier.daily_limit(QuotaKind::SuperLike) {
            Some(limit) => {
                let used = self.store.used(user_id, QuotaKind::SuperLike, day).await?;
                Some((limit - used).max(0))
            }
            None => None,
        };

        Ok(QuotaSnapshot {
            likes_remaining,
            super_likes_remaining,
            resets_at: self.policy.resets_at(now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{FREE_DAILY_LIKES, FREE_DAILY_SUPER_LIKES};
    use crate::store::memory::MemoryQuotaStore;
    use chrono::TimeZone;

    fn free_ledger() -> QuotaLedger<MemoryQuotaStore> {
        QuotaLedger::new(MemoryQuotaStore::new(), QuotaPolicy::default())
    }

    #[tokio::test]
    async fn free_tier_likes_stop_at_the_daily_limit() {
        let ledger = free_ledger();
        for i in 0..FREE_DAILY_LIKES {
            let outcome = ledger
                .try_consume("u1", QuotaKind::Like, SubscriptionTier::Free)
                .await
                .unwrap();
            assert_eq!(
                outcome,
                LedgerOutcome::Allowed {
                    remaining: Some(FREE_DAILY_LIKES - i - 1)
                }
            );
        }

        let outcome = ledger
            .try_consume("u1", QuotaKind::Like, SubscriptionTier::Free)
            .await
            .unwrap();
        assert_eq!(outcome, LedgerOutcome::Denied(QuotaDenial::LikesExhausted));
    }

    #[tokio::test]
    async fn like_and_super_like_counters_are_independent() {
        let ledger = free_ledger();
        for _ in 0..FREE_DAILY_LIKES {
            ledger
                .try_consume("u1", QuotaKind::Like, SubscriptionTier::Free)
                .await
                .unwrap();
        }

        // Likes are gone; the super-like allowance is untouched.
        let outcome = ledger
            .try_consume("u1", QuotaKind::SuperLike, SubscriptionTier::Free)
            .await
            .unwrap();
        assert_eq!(outcome, LedgerOutcome::Allowed { remaining: Some(0) });

        let outcome = ledger
            .try_consume("u1", QuotaKind::SuperLike, SubscriptionTier::Free)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            LedgerOutcome::Denied(QuotaDenial::SuperLikesExhausted)
        );
        assert_eq!(FREE_DAILY_SUPER_LIKES, 1);
    }

    #[tokio::test]
    async fn vip_is_unlimited() {
        let ledger = free_ledger();
        for _ in 0..500 {
            let outcome = ledger
                .try_consume("vip", QuotaKind::Like, SubscriptionTier::Vip)
                .await
                .unwrap();
            assert_eq!(outcome, LedgerOutcome::Allowed { remaining: None });
        }
    }

    #[tokio::test]
    async fn racing_consumers_never_exceed_the_limit() {
        let ledger = std::sync::Arc::new(free_ledger());

        let mut handles = Vec::new();
        for _ in 0..50 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger
                    .try_consume("u1", QuotaKind::Like, SubscriptionTier::Free)
                    .await
                    .unwrap()
            }));
        }

        let mut allowed = 0;
        for handle in handles {
            if matches!(handle.await.unwrap(), LedgerOutcome::Allowed { .. }) {
                allowed += 1;
            }
        }
        assert_eq!(allowed as i64, FREE_DAILY_LIKES);
    }

    #[tokio::test]
    async fn refund_frees_a_slot() {
        let ledger = free_ledger();
        for _ in 0..FREE_DAILY_LIKES {
            ledger
                .try_consume("u1", QuotaKind::Like, SubscriptionTier::Free)
                .await
                .unwrap();
        }
        ledger.refund("u1", QuotaKind::Like).await.unwrap();

        let outcome = ledger
            .try_consume("u1", QuotaKind::Like, SubscriptionTier::Free)
            .await
            .unwrap();
        assert_eq!(outcome, LedgerOutcome::Allowed { remaining: Some(0) });
    }

    #[tokio::test]
    async fn snapshot_reports_remaining_and_reset() {
        let ledger = free_ledger();
        for _ in 0..3 {
            ledger
                .try_consume("u1", QuotaKind::Like, SubscriptionTier::Free)
                .await
                .unwrap();
        }

        let snapshot = ledger
            .snapshot("u1", SubscriptionTier::Free)
            .await
            .unwrap();
        assert_eq!(snapshot.likes_remaining, Some(FREE_DAILY_LIKES - 3));
        assert_eq!(snapshot.super_likes_remaining, Some(FREE_DAILY_SUPER_LIKES));
        assert!(snapshot.resets_at > Utc::now());

        let vip = ledger.snapshot("u1", SubscriptionTier::Vip).await.unwrap();
        assert_eq!(vip.likes_remaining, None);
    }

    #[test]
    fn day_bucket_respects_the_configured_timezone() {
        // 2026-08-23 03:00 UTC is still 2026-08-22 in New York.
        let now = Utc.with_ymd_and_hms(2026, 8, 23, 3, 0, 0).unwrap();

        let utc_policy = QuotaPolicy::default();
        assert_eq!(
            utc_policy.day_bucket(now),
            NaiveDate::from_ymd_opt(2026, 8, 23).unwrap()
        );

        let ny_policy = QuotaPolicy::new(chrono_tz::America::New_York);
        assert_eq!(
            ny_policy.day_bucket(now),
            NaiveDate::from_ymd_opt(2026, 8, 22).unwrap()
        );

        // The reset boundary is the next local midnight.
        let reset = ny_policy.resets_at(now);
        assert_eq!(ny_policy.day_bucket(reset), NaiveDate::from_ymd_opt(2026, 8, 23).unwrap());
        assert!(reset > now);
    }

    #[test]
    fn consecutive_days_use_distinct_buckets() {
        let policy = QuotaPolicy::default();
        let today = Utc.with_ymd_and_hms(2026, 8, 23, 23, 59, 59).unwrap();
        let tomorrow = Utc.with_ymd_and_hms(2026, 8, 24, 0, 0, 1).unwrap();
        assert_ne!(policy.day_bucket(today), policy.day_bucket(tomorrow));
    }
}
