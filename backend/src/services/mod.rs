pub mod chat;
pub mod discovery;
pub mod filter;
pub mod matching;
pub mod notify;
pub mod quota;
pub mod scorer;
pub mod swipes;

pub use chat::ChatService;
pub use discovery::DiscoveryService;
pub use filter::CandidateFilter;
pub use matching::{MatchFormation, reconcile_conversations};
pub use notify::NotificationService;
pub use quota::{QuotaLedger, QuotaPolicy};
pub use scorer::ScoreWeights;
pub use swipes::SwipeProcessor;

use crate::error::EngineError;
use crate::models::{
    DiscoveryFilters, DiscoveryOutcome, QuotaSnapshot, RewindOutcome, SwipeKind, SwipeOutcome,
};
use crate::store::{
    ConversationStore, MatchStore, NotificationDispatch, ProfilePool, QuotaStore,
    SubscriptionStatus, SwipeStore,
};

/// The discovery & matching engine: one facade over the component services,
/// exposing the surface the presentation layer consumes.
pub struct Engine<S, M, Q, P, B, C, N> {
    processor: SwipeProcessor<S, M, Q, B, C, N>,
    discovery: DiscoveryService<P, S, M>,
    ledger: QuotaLedger<Q>,
    subs: B,
}

impl<S, M, Q, P, B, C, N> Engine<S, M, Q, P, B, C, N>
where
    S: SwipeStore + Clone,
    M: MatchStore + Clone,
    Q: QuotaStore + Clone,
    P: ProfilePool,
    B: SubscriptionStatus + Clone,
    C: ConversationStore,
    N: NotificationDispatch,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        swipes: S,
        matches: M,
        quotas: Q,
        pool: P,
        subs: B,
        chat: C,
        notify: N,
        policy: QuotaPolicy,
        weights: ScoreWeights,
    ) -> Self {
        let ledger = QuotaLedger::new(quotas, policy);
        let formation = MatchFormation::new(matches.clone(), chat, notify);
        let processor = SwipeProcessor::new(
            swipes.clone(),
            matches.clone(),
            subs.clone(),
            ledger.clone(),
            formation,
        );
        let filter = CandidateFilter::new(pool, swipes.clone(), matches, weights);
        let discovery = DiscoveryService::new(filter, swipes);

        Self {
            processor,
            discovery,
            ledger,
            subs,
        }
    }

    pub async fn discover_next(&self, user_id: &str) -> Result<DiscoveryOutcome, EngineError> {
        self.discovery.next(user_id).await
    }

    pub async fn submit_swipe(
        &self,
        actor_id: &str,
        target_id: &str,
        kind: SwipeKind,
    ) -> Result<SwipeOutcome, EngineError> {
        self.processor.submit(actor_id, target_id, kind).await
    }

    pub async fn undo_last_swipe(&self, user_id: &str) -> Result<RewindOutcome, EngineError> {
        self.discovery.rewind(user_id).await
    }

    pub async fn set_filters(
        &self,
        user_id: &str,
        filters: DiscoveryFilters,
    ) -> Result<(), EngineError> {
        self.discovery.set_filters(user_id, filters).await
    }

    pub async fn current_quota(&self, user_id: &str) -> Result<QuotaSnapshot, EngineError> {
        let tier = self
            .subs
            .tier_of(user_id)
            .await
            .map_err(EngineError::Storage)?
            .ok_or_else(|| EngineError::UnknownUser(user_id.to_string()))?;
        self.ledger
            .snapshot(user_id, tier)
            .await
            .map_err(EngineError::Storage)
    }
}
