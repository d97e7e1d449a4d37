//! The swipe state machine: Unswiped → Swiped(kind), terminal. Validates,
//! consumes quota, records the decision, and triggers match formation on
//! reciprocal interest.

use tracing::error;

use crate::error::EngineError;
use crate::models::{PairKey, QuotaKind, SwipeDecision, SwipeKind, SwipeOutcome};
use crate::services::matching::MatchFormation;
use crate::services::quota::{LedgerOutcome, QuotaLedger};
use crate::store::{
    ConversationStore, MatchStore, NotificationDispatch, QuotaStore, RecordOutcome,
    SubscriptionStatus, SwipeStore,
};

pub struct SwipeProcessor<S, M, Q, B, C, N> {
    swipes: S,
    matches: M,
    subs: B,
    ledger: QuotaLedger<Q>,
    formation: MatchFormation<M, C, N>,
}

impl<S, M, Q, B, C, N> SwipeProcessor<S, M, Q, B, C, N>
where
    S: SwipeStore,
    M: MatchStore,
    Q: QuotaStore,
    B: SubscriptionStatus,
    C: ConversationStore,
    N: NotificationDispatch,
{
    pub fn new(
        swipes: S,
        matches: M,
        subs: B,
        ledger: QuotaLedger<Q>,
        formation: MatchFormation<M, C, N>,
    ) -> Self {
        Self {
            swipes,
            matches,
            subs,
            ledger,
            formation,
        }
    }

    pub async fn submit(
        &self,
        actor_id: &str,
        target_id: &str,
        kind: SwipeKind,
    ) -> Result<SwipeOutcome, EngineError> {
        if actor_id == target_id {
            return Err(EngineError::SelfSwipe);
        }

        let tier = self
            .subs
            .tier_of(actor_id)
            .await
            .map_err(EngineError::Storage)?
            .ok_or_else(|| EngineError::UnknownUser(actor_id.to_string()))?;
        if self
            .subs
            .tier_of(target_id)
            .await
            .map_err(EngineError::Storage)?
            .is_none()
        {
            return Err(EngineError::UnknownUser(target_id.to_string()));
        }

        // The candidate feed is not always fresh: a pair can already be
        // matched (or swiped) by the time this submission lands. Both cases
        // are safe no-ops for the caller; the UI just advances.
        let pair = PairKey::new(actor_id, target_id);
        if self
            .matches
            .find(&pair)
            .await
            .map_err(EngineError::Storage)?
            .is_some()
        {
            return Ok(SwipeOutcome::AlreadySwiped);
        }
        if let Some(mine) = self
            .swipes
            .find(actor_id, target_id)
            .await
            .map_err(EngineError::Storage)?
        {
            return self.resolve_duplicate(&mine).await;
        }

        // Quota is consumed before the decision is recorded. A denied attempt
        // leaves no trace, so the user can retry once the bucket resets.
        let consumed: Option<QuotaKind> = match kind.quota_kind() {
            Some(quota_kind) => {
                match self
                    .ledger
                    .try_consume(actor_id, quota_kind, tier)
                    .await
                    .map_err(EngineError::Storage)?
                {
                    LedgerOutcome::Denied(denial) => {
                        return Ok(SwipeOutcome::QuotaExceeded(denial));
                    }
                    LedgerOutcome::Allowed { .. } => Some(quota_kind),
                }
            }
            None => None,
        };

        let decision = SwipeDecision::new(actor_id, target_id, kind);
        match self.swipes.record(&decision).await {
            Ok(RecordOutcome::Inserted) => {}
            Ok(RecordOutcome::Duplicate) => {
                // Lost a duplicate race after consuming; hand the slot back.
                if let Some(quota_kind) = consumed {
                    self.refund_quietly(actor_id, quota_kind).await;
                }
                let mine = self
                    .swipes
                    .find(actor_id, target_id)
                    .await
                    .map_err(EngineError::Storage)?;
                return match mine {
                    Some(mine) => self.resolve_duplicate(&mine).await,
                    None => Ok(SwipeOutcome::AlreadySwiped),
                };
            }
            Err(err) => {
                if let Some(quota_kind) = consumed {
                    self.refund_quietly(actor_id, quota_kind).await;
                }
                return Err(EngineError::Storage(err));
            }
        }

        if !kind.expresses_interest() {
            return Ok(SwipeOutcome::Recorded);
        }

        let reciprocal = self
            .swipes
            .find(target_id, actor_id)
            .await
            .map_err(EngineError::Storage)?;
        match reciprocal {
            Some(theirs) if theirs.kind.expresses_interest() => {
                let m = self
                    .formation
                    .form_match(actor_id, target_id)
                    .await
                    .map_err(EngineError::Storage)?;
                Ok(SwipeOutcome::MatchFormed(m))
            }
            _ => Ok(SwipeOutcome::Recorded),
        }
    }

    /// A decision for this (actor, target) already exists. Usually that ends
    /// the submission, but a crash between recording a like and forming the
    /// match leaves two reciprocal interest decisions with no Match row.
    /// Re-check reciprocity here so a retried submission completes the
    /// transition instead of reporting `AlreadySwiped` forever.
    async fn resolve_duplicate(
        &self,
        mine: &SwipeDecision,
    ) -> Result<SwipeOutcome, EngineError> {
        if !mine.kind.expresses_interest() {
            return Ok(SwipeOutcome::AlreadySwiped);
        }
        let reciprocal = self
            .swipes
            .find(&mine.target_id, &mine.actor_id)
            .await
            .map_err(EngineError::Storage)?;
        match reciprocal {
            Some(theirs) if theirs.kind.expresses_interest() => {
                let m = self
                    .formation
                    .form_match(&mine.actor_id, &mine.target_id)
                    .await
                    .map_err(EngineError::Storage)?;
                Ok(SwipeOutcome::MatchFormed(m))
            }
            _ => Ok(SwipeOutcome::AlreadySwiped),
        }
    }

    async fn refund_quietly(&self, user_id: &str, kind: QuotaKind) {
        if let Err(err) = self.ledger.refund(user_id, kind).await {
            error!("failed to refund {kind:?} quota for {user_id}: {err:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::FREE_DAILY_LIKES;
    use crate::models::{QuotaDenial, SubscriptionTier};
    use crate::services::quota::QuotaPolicy;
    use crate::store::memory::{
        MemoryConversationStore, MemoryMatchStore, MemoryNotifier, MemoryProfilePool,
        MemoryQuotaStore, MemorySwipeStore, sample_profile,
    };
    use std::sync::Arc;

    struct Fixture {
        processor: SwipeProcessor<
            MemorySwipeStore,
            MemoryMatchStore,
            MemoryQuotaStore,
            MemoryProfilePool,
            MemoryConversationStore,
            MemoryNotifier,
        >,
        swipes: MemorySwipeStore,
        matches: MemoryMatchStore,
        quotas: MemoryQuotaStore,
        pool: MemoryProfilePool,
        chat: MemoryConversationStore,
        notifier: MemoryNotifier,
    }

    fn fixture() -> Fixture {
        let swipes = MemorySwipeStore::new();
        let matches = MemoryMatchStore::new();
        let quotas = MemoryQuotaStore::new();
        let pool = MemoryProfilePool::new();
        let chat = MemoryConversationStore::new();
        let notifier = MemoryNotifier::new();

        for id in ["alice", "bob", "carol"] {
            pool.insert(sample_profile(id));
        }

        let ledger = QuotaLedger::new(quotas.clone(), QuotaPolicy::default());
        let formation = MatchFormation::new(matches.clone(), chat.clone(), notifier.clone());
        let processor = SwipeProcessor::new(
            swipes.clone(),
            matches.clone(),
            pool.clone(),
            ledger,
            formation,
        );

        Fixture {
            processor,
            swipes,
            matches,
            quotas,
            pool,
            chat,
            notifier,
        }
    }

    #[tokio::test]
    async fn self_swipe_is_rejected() {
        let f = fixture();
        let err = f
            .processor
            .submit("alice", "alice", SwipeKind::Like)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::SelfSwipe));
    }

    #[tokio::test]
    async fn unknown_users_are_rejected() {
        let f = fixture();
        assert!(matches!(
            f.processor.submit("ghost", "alice", SwipeKind::Like).await,
            Err(EngineError::UnknownUser(_))
        ));
        assert!(matches!(
            f.processor.submit("alice", "ghost", SwipeKind::Like).await,
            Err(EngineError::UnknownUser(_))
        ));
    }

    #[tokio::test]
    async fn one_sided_like_is_recorded_without_a_match() {
        let f = fixture();
        let outcome = f
            .processor
            .submit("alice", "bob", SwipeKind::Like)
            .await
            .unwrap();
        assert!(matches!(outcome, SwipeOutcome::Recorded));
        assert!(
            f.matches
                .find(&PairKey::new("alice", "bob"))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn mutual_like_forms_a_match_and_counts_quota() {
        let f = fixture();

        // Alice has already used 3 likes today.
        for target in ["t1", "t2", "t3"] {
            f.pool.insert(sample_profile(target));
            f.processor
                .submit("alice", target, SwipeKind::Like)
                .await
                .unwrap();
        }

        f.processor
            .submit("bob", "alice", SwipeKind::Like)
            .await
            .unwrap();
        let outcome = f
            .processor
            .submit("alice", "bob", SwipeKind::Like)
            .await
            .unwrap();

        let SwipeOutcome::MatchFormed(m) = outcome else {
            panic!("expected MatchFormed, got {outcome:?}");
        };
        assert_eq!(m.user_a, "alice");
        assert_eq!(m.user_b, "bob");
        assert!(m.conversation_id.is_some());
        assert_eq!(f.notifier.delivered(), 1);

        // 4 likes used now.
        let day = QuotaPolicy::default().day_bucket(chrono::Utc::now());
        assert_eq!(f.quotas.used("alice", QuotaKind::Like, day).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn super_like_reciprocates_a_like() {
        let f = fixture();
        f.processor
            .submit("bob", "alice", SwipeKind::Like)
            .await
            .unwrap();
        let outcome = f
            .processor
            .submit("alice", "bob", SwipeKind::SuperLike)
            .await
            .unwrap();
        assert!(matches!(outcome, SwipeOutcome::MatchFormed(_)));
    }

    #[tokio::test]
    async fn a_pass_never_forms_a_match() {
        let f = fixture();
        f.processor
            .submit("bob", "alice", SwipeKind::Like)
            .await
            .unwrap();
        let outcome = f
            .processor
            .submit("alice", "bob", SwipeKind::Pass)
            .await
            .unwrap();
        assert!(matches!(outcome, SwipeOutcome::Recorded));
        assert!(
            f.matches
                .find(&PairKey::new("alice", "bob"))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn second_swipe_on_the_same_target_is_already_swiped() {
        let f = fixture();
        f.processor
            .submit("alice", "bob", SwipeKind::Like)
            .await
            .unwrap();
        let outcome = f
            .processor
            .submit("alice", "bob", SwipeKind::Like)
            .await
            .unwrap();
        assert!(matches!(outcome, SwipeOutcome::AlreadySwiped));

        // The duplicate did not consume quota.
        let day = QuotaPolicy::default().day_bucket(chrono::Utc::now());
        assert_eq!(f.quotas.used("alice", QuotaKind::Like, day).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn quota_exhaustion_leaves_no_decision() {
        let f = fixture();
        for i in 0..FREE_DAILY_LIKES {
            let id = format!("extra{i}");
            f.pool.insert(sample_profile(&id));
            f.processor
                .submit("alice", &id, SwipeKind::Like)
                .await
                .unwrap();
        }

        let outcome = f
            .processor
            .submit("alice", "bob", SwipeKind::Like)
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            SwipeOutcome::QuotaExceeded(QuotaDenial::LikesExhausted)
        ));

        // No decision recorded, so bob can be retried after reset.
        assert!(f.swipes.find("alice", "bob").await.unwrap().is_none());

        // Passing is still unlimited.
        let outcome = f
            .processor
            .submit("alice", "bob", SwipeKind::Pass)
            .await
            .unwrap();
        assert!(matches!(outcome, SwipeOutcome::Recorded));
    }

    #[tokio::test]
    async fn record_failure_refunds_the_quota_slot() {
        let f = fixture();
        f.swipes.fail_next_record();

        let result = f.processor.submit("alice", "bob", SwipeKind::Like).await;
        assert!(matches!(result, Err(EngineError::Storage(_))));

        let day = QuotaPolicy::default().day_bucket(chrono::Utc::now());
        assert_eq!(f.quotas.used("alice", QuotaKind::Like, day).await.unwrap(), 0);

        // The failed attempt did not burn the pair; a retry works.
        let outcome = f
            .processor
            .submit("alice", "bob", SwipeKind::Like)
            .await
            .unwrap();
        assert!(matches!(outcome, SwipeOutcome::Recorded));
    }

    #[tokio::test]
    async fn retry_completes_a_match_interrupted_before_formation() {
        let f = fixture();

        // The state a crash between recording and formation leaves behind:
        // both interest decisions durable, no match row.
        f.swipes
            .record(&SwipeDecision::new("alice", "bob", SwipeKind::Like))
            .await
            .unwrap();
        f.swipes
            .record(&SwipeDecision::new("bob", "alice", SwipeKind::Like))
            .await
            .unwrap();
        assert!(
            f.matches
                .find(&PairKey::new("alice", "bob"))
                .await
                .unwrap()
                .is_none()
        );

        // A retried submission from either side finishes the transition.
        let outcome = f
            .processor
            .submit("alice", "bob", SwipeKind::Like)
            .await
            .unwrap();
        assert!(matches!(outcome, SwipeOutcome::MatchFormed(_)));
        assert!(
            f.matches
                .find(&PairKey::new("alice", "bob"))
                .await
                .unwrap()
                .is_some()
        );
        assert_eq!(f.notifier.delivered(), 1);

        // No extra quota was spent on the repair.
        let day = QuotaPolicy::default().day_bucket(chrono::Utc::now());
        assert_eq!(f.quotas.used("alice", QuotaKind::Like, day).await.unwrap(), 0);

        // The other side now just sees the existing match.
        let outcome = f
            .processor
            .submit("bob", "alice", SwipeKind::Like)
            .await
            .unwrap();
        assert!(matches!(outcome, SwipeOutcome::AlreadySwiped));
    }

    #[tokio::test]
    async fn concurrent_mutual_likes_form_exactly_one_match() {
        let f = Arc::new(fixture());

        // Seed the reciprocal halves so both submissions detect mutual
        // interest and race into formation.
        f.swipes
            .record(&SwipeDecision::new("alice", "bob", SwipeKind::Like))
            .await
            .unwrap();
        f.swipes
            .record(&SwipeDecision::new("bob", "alice", SwipeKind::Like))
            .await
            .unwrap();

        let formation = Arc::new(MatchFormation::new(
            f.matches.clone(),
            f.chat.clone(),
            f.notifier.clone(),
        ));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let formation = formation.clone();
            handles.push(tokio::spawn(async move {
                formation.form_match("alice", "bob").await.unwrap()
            }));
        }

        let mut ids = std::collections::HashSet::new();
        for handle in handles {
            ids.insert(handle.await.unwrap().id);
        }
        assert_eq!(ids.len(), 1, "all racers must converge on one match");
        assert_eq!(f.chat.conversation_count(), 1);
    }

    #[tokio::test]
    async fn chat_store_failure_does_not_lose_the_match() {
        let f = fixture();
        f.chat.set_failing(true);

        f.processor
            .submit("bob", "alice", SwipeKind::Like)
            .await
            .unwrap();
        let outcome = f
            .processor
            .submit("alice", "bob", SwipeKind::Like)
            .await
            .unwrap();

        let SwipeOutcome::MatchFormed(m) = outcome else {
            panic!("expected MatchFormed, got {outcome:?}");
        };
        assert!(m.conversation_id.is_none());
        assert!(
            f.matches
                .find(&PairKey::new("alice", "bob"))
                .await
                .unwrap()
                .is_some()
        );
    }
}
