//! Trait seams between the engine and its durable state / external
//! collaborators. Postgres implementations live in [`crate::db`]; HTTP
//! collaborator clients in [`crate::services`]; in-memory test doubles in
//! [`memory`].

use std::future::Future;

use anyhow::Result;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::{Match, PairKey, Profile, QuotaKind, SubscriptionTier, SwipeDecision};

#[cfg(any(test, feature = "testkit"))]
pub mod memory;

/// Result of an append-only insert keyed on (actor, target).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Inserted,
    Duplicate,
}

/// Result of one atomic quota increment-and-compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// Counter was durably incremented; `used` is the new value.
    Allowed { used: i64 },
    /// The limit was already reached; nothing was written.
    Denied,
}

/// Append-only store of swipe decisions.
pub trait SwipeStore: Send + Sync {
    /// Insert-if-absent. Must be atomic against a concurrent insert for the
    /// same (actor, target).
    fn record(&self, decision: &SwipeDecision)
    -> impl Future<Output = Result<RecordOutcome>> + Send;

    fn find(
        &self,
        actor_id: &str,
        target_id: &str,
    ) -> impl Future<Output = Result<Option<SwipeDecision>>> + Send;

    /// All targets this actor has ever decided on, any kind.
    fn swiped_targets(&self, actor_id: &str) -> impl Future<Output = Result<Vec<String>>> + Send;
}

/// Store of formed matches, keyed by canonical pair.
pub trait MatchStore: Send + Sync {
    /// Compare-and-create. Returns the match and whether this call created
    /// it; a racing loser receives the winner's row.
    fn create(&self, pair: &PairKey) -> impl Future<Output = Result<(Match, bool)>> + Send;

    fn find(&self, pair: &PairKey) -> impl Future<Output = Result<Option<Match>>> + Send;

    /// Ids of every user already matched with `user_id`.
    fn matched_user_ids(&self, user_id: &str)
    -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Backfill the conversation id once the chat store accepts the pair.
    fn set_conversation(
        &self,
        pair: &PairKey,
        conversation_id: Uuid,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Oldest matches still lacking a conversation, for the reconciler.
    fn without_conversation(&self, limit: i64)
    -> impl Future<Output = Result<Vec<Match>>> + Send;
}

/// Per-user, per-kind, per-day counters.
pub trait QuotaStore: Send + Sync {
    /// Atomic increment-and-compare against `limit` (`None` = unlimited).
    /// Two racing calls on the last free slot must not both be allowed.
    fn try_consume(
        &self,
        user_id: &str,
        kind: QuotaKind,
        day_bucket: NaiveDate,
        limit: Option<i64>,
    ) -> impl Future<Output = Result<ConsumeOutcome>> + Send;

    /// Compensation for a consume whose swipe never got recorded.
    fn refund(
        &self,
        user_id: &str,
        kind: QuotaKind,
        day_bucket: NaiveDate,
    ) -> impl Future<Output = Result<()>> + Send;

    fn used(
        &self,
        user_id: &str,
        kind: QuotaKind,
        day_bucket: NaiveDate,
    ) -> impl Future<Output = Result<i64>> + Send;
}

/// Coarse paging criteria pushed down to the profile pool. The engine applies
/// the full conjunctive filter set on top of what comes back.
#[derive(Debug, Clone, Copy)]
pub struct FetchCriteria {
    pub min_age: i32,
    pub max_age: i32,
}

/// Read-only access to the externally owned profile records.
pub trait ProfilePool: Send + Sync {
    fn get(&self, user_id: &str) -> impl Future<Output = Result<Option<Profile>>> + Send;

    /// One page of candidate profiles, most recently active first. Returns
    /// the page and the token for the next one, if any.
    fn fetch_page(
        &self,
        criteria: &FetchCriteria,
        page_token: Option<i64>,
        limit: i64,
    ) -> impl Future<Output = Result<(Vec<Profile>, Option<i64>)>> + Send;
}

/// Current billing tier, owned by the subscription service.
pub trait SubscriptionStatus: Send + Sync {
    fn tier_of(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Option<SubscriptionTier>>> + Send;
}

/// External chat store. Creation is idempotent per unordered pair.
pub trait ConversationStore: Send + Sync {
    fn create_conversation(&self, pair: &PairKey) -> impl Future<Output = Result<Uuid>> + Send;
}

/// Push/notification delivery. Fire-and-forget; implementations log failures
/// and never propagate them.
pub trait NotificationDispatch: Send + Sync {
    fn notify_match(&self, pair: &PairKey, match_id: Uuid) -> impl Future<Output = ()> + Send;
}
