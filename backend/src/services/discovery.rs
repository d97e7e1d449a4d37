//! Per-user discovery sessions: a cursor over the filtered, scored candidate
//! queue, with refill-on-exhaustion and rewind. Session state is in-memory
//! only; everything in it is recomputable from the stores.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::constants::EXHAUSTED_RETRY_SECS;
use crate::error::EngineError;
use crate::models::{CandidateView, DiscoveryFilters, DiscoveryOutcome, RewindOutcome};
use crate::services::filter::CandidateFilter;
use crate::store::{MatchStore, ProfilePool, SwipeStore};

#[derive(Debug, Default)]
struct DiscoveryQueue {
    filters: DiscoveryFilters,
    queue: Vec<CandidateView>,
    /// Index of the next candidate to surface.
    cursor: usize,
    initialized: bool,
    exhausted_at: Option<Instant>,
}

impl DiscoveryQueue {
    fn load(&mut self, queue: Vec<CandidateView>) {
        self.queue = queue;
        self.cursor = 0;
        self.initialized = true;
    }

    fn invalidate(&mut self, filters: DiscoveryFilters) {
        self.filters = filters;
        self.queue.clear();
        self.cursor = 0;
        self.initialized = false;
        self.exhausted_at = None;
    }

    /// Exhausted is terminal until preferences change or enough time passes
    /// for a refill to plausibly find something new.
    fn refill_blocked(&self) -> bool {
        self.exhausted_at
            .is_some_and(|at| at.elapsed() < Duration::from_secs(EXHAUSTED_RETRY_SECS))
    }
}

pub struct DiscoveryService<P, S, M> {
    filter: CandidateFilter<P, S, M>,
    swipes: S,
    // Sessions are locked per user: the registry lock is only held to fetch
    // the entry, never across a queue build, so users stay independent.
    sessions: Mutex<HashMap<String, Arc<Mutex<DiscoveryQueue>>>>,
}

impl<P, S, M> DiscoveryService<P, S, M>
where
    P: ProfilePool,
    S: SwipeStore + Clone,
    M: MatchStore,
{
    pub fn new(filter: CandidateFilter<P, S, M>, swipes: S) -> Self {
        Self {
            filter,
            swipes,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub async fn next(&self, user_id: &str) -> Result<DiscoveryOutcome, EngineError> {
        let entry = self.session(user_id).await;
        let mut session = entry.lock().await;

        if !session.initialized {
            let queue = self.filter.build_queue(user_id, &session.filters).await?;
            session.load(queue);
        }

        if let Some(candidate) = self.advance(user_id, &mut session).await? {
            return Ok(DiscoveryOutcome::Candidate(candidate));
        }

        // Queue drained: refill once, unless we recently came up empty.
        if session.refill_blocked() {
            return Ok(DiscoveryOutcome::Exhausted);
        }
        let queue = self.filter.build_queue(user_id, &session.filters).await?;
        session.load(queue);

        if let Some(candidate) = self.advance(user_id, &mut session).await? {
            session.exhausted_at = None;
            return Ok(DiscoveryOutcome::Candidate(candidate));
        }
        session.exhausted_at = Some(Instant::now());
        Ok(DiscoveryOutcome::Exhausted)
    }

    /// Re-surfaces the candidate before the one currently displayed. Recorded
    /// decisions are never undone: anything already swiped is skipped, so the
    /// quota and single-decision invariants cannot be bypassed by going back.
    pub async fn rewind(&self, user_id: &str) -> Result<RewindOutcome, EngineError> {
        let entry = {
            let sessions = self.sessions.lock().await;
            sessions.get(user_id).cloned()
        };
        let Some(entry) = entry else {
            return Ok(RewindOutcome::NoHistory);
        };
        let mut session = entry.lock().await;
        if session.cursor <= 1 {
            return Ok(RewindOutcome::NoHistory);
        }

        // queue[cursor - 1] is the card on screen; walk back from before it.
        let mut idx = session.cursor - 1;
        while idx > 0 {
            idx -= 1;
            let candidate = session.queue[idx].clone();
            if self
                .swipes
                .find(user_id, &candidate.user_id)
                .await
                .map_err(EngineError::Storage)?
                .is_none()
            {
                session.cursor = idx + 1;
                return Ok(RewindOutcome::Candidate(candidate));
            }
        }
        Ok(RewindOutcome::NoHistory)
    }

    pub async fn set_filters(
        &self,
        user_id: &str,
        filters: DiscoveryFilters,
    ) -> Result<(), EngineError> {
        filters.validate().map_err(EngineError::InvalidFilters)?;
        let entry = self.session(user_id).await;
        entry.lock().await.invalidate(filters);
        Ok(())
    }

    async fn session(&self, user_id: &str) -> Arc<Mutex<DiscoveryQueue>> {
        let mut sessions = self.sessions.lock().await;
        sessions.entry(user_id.to_string()).or_default().clone()
    }

    /// Surfaces the next candidate that has not been swiped since the queue
    /// was built.
    async fn advance(
        &self,
        user_id: &str,
        session: &mut DiscoveryQueue,
    ) -> Result<Option<CandidateView>, EngineError> {
        while session.cursor < session.queue.len() {
            let candidate = session.queue[session.cursor].clone();
            session.cursor += 1;
            if self
                .swipes
                .find(user_id, &candidate.user_id)
                .await
                .map_err(EngineError::Storage)?
                .is_none()
            {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }
}
