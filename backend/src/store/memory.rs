//! In-memory store implementations with the same atomicity contracts as the
//! Postgres layer. Shared by unit tests and, via the `testkit` feature,
//! integration tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::models::{
    Intention, Match, PairKey, Profile, QuotaKind, SubscriptionTier, SwipeDecision,
};
use crate::store::{
    ConsumeOutcome, ConversationStore, FetchCriteria, MatchStore, NotificationDispatch,
    ProfilePool, QuotaStore, RecordOutcome, SubscriptionStatus, SwipeStore,
};

#[derive(Debug, Clone, Default)]
pub struct MemorySwipeStore {
    swipes: Arc<Mutex<HashMap<(String, String), SwipeDecision>>>,
    fail_next_record: Arc<AtomicBool>,
}

impl MemorySwipeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `record` call fail, for exercising the quota
    /// compensation path.
    pub fn fail_next_record(&self) {
        self.fail_next_record.store(true, Ordering::SeqCst);
    }
}

impl SwipeStore for MemorySwipeStore {
    async fn record(&self, decision: &SwipeDecision) -> Result<RecordOutcome> {
        if self.fail_next_record.swap(false, Ordering::SeqCst) {
            return Err(anyhow!("injected swipe store failure"));
        }
        let mut swipes = self.swipes.lock().expect("swipe store poisoned");
        let key = (decision.actor_id.clone(), decision.target_id.clone());
        if swipes.contains_key(&key) {
            return Ok(RecordOutcome::Duplicate);
        }
        swipes.insert(key, decision.clone());
        Ok(RecordOutcome::Inserted)
    }

    async fn find(&self, actor_id: &str, target_id: &str) -> Result<Option<SwipeDecision>> {
        let swipes = self.swipes.lock().expect("swipe store poisoned");
        Ok(swipes
            .get(&(actor_id.to_string(), target_id.to_string()))
            .cloned())
    }

    async fn swiped_targets(&self, actor_id: &str) -> Result<Vec<String>> {
        let swipes = self.swipes.lock().expect("swipe store poisoned");
        Ok(swipes
            .keys()
            .filter(|(actor, _)| actor == actor_id)
            .map(|(_, target)| target.clone())
            .collect())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryMatchStore {
    matches: Arc<Mutex<HashMap<PairKey, Match>>>,
}

impl MemoryMatchStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MatchStore for MemoryMatchStore {
    async fn create(&self, pair: &PairKey) -> Result<(Match, bool)> {
        let mut matches = self.matches.lock().expect("match store poisoned");
        if let Some(existing) = matches.get(pair) {
            return Ok((existing.clone(), false));
        }
        let m = Match {
            id: Uuid::new_v4(),
            user_a: pair.a().to_string(),
            user_b: pair.b().to_string(),
            conversation_id: None,
            formed_at: Utc::now(),
        };
        matches.insert(pair.clone(), m.clone());
        Ok((m, true))
    }

    async fn find(&self, pair: &PairKey) -> Result<Option<Match>> {
        let matches = self.matches.lock().expect("match store poisoned");
        Ok(matches.get(pair).cloned())
    }

    async fn matched_user_ids(&self, user_id: &str) -> Result<Vec<String>> {
        let matches = self.matches.lock().expect("match store poisoned");
        Ok(matches
            .values()
            .filter_map(|m| {
                if m.user_a == user_id {
                    Some(m.user_b.clone())
                } else if m.user_b == user_id {
                    Some(m.user_a.clone())
                } else {
                    None
                }
            })
            .collect())
    }

    async fn set_conversation(&self, pair: &PairKey, conversation_id: Uuid) -> Result<()> {
        let mut matches = self.matches.lock().expect("match store poisoned");
        if let Some(m) = matches.get_mut(pair) {
            if m.conversation_id.is_none() {
                m.conversation_id = Some(conversation_id);
            }
        }
        Ok(())
    }

    async fn without_conversation(&self, limit: i64) -> Result<Vec<Match>> {
        let matches = self.matches.lock().expect("match store poisoned");
        let mut pending: Vec<Match> = matches
            .values()
            .filter(|m| m.conversation_id.is_none())
            .cloned()
            .collect();
        pending.sort_by_key(|m| m.formed_at);
        pending.truncate(limit as usize);
        Ok(pending)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryQuotaStore {
    counters: Arc<Mutex<HashMap<(String, QuotaKind, NaiveDate), i64>>>,
}

impl MemoryQuotaStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl QuotaStore for MemoryQuotaStore {
    async fn try_consume(
        &self,
        user_id: &str,
        kind: QuotaKind,
        day_bucket: NaiveDate,
        limit: Option<i64>,
    ) -> Result<ConsumeOutcome> {
        // Compare and increment under one guard; this is the whole atomicity
        // contract.
        let mut counters = self.counters.lock().expect("quota store poisoned");
        let used = counters
            .entry((user_id.to_string(), kind, day_bucket))
            .or_insert(0);
        if let Some(limit) = limit {
            if *used >= limit {
                return Ok(ConsumeOutcome::Denied);
            }
        }
        *used += 1;
        Ok(ConsumeOutcome::Allowed { used: *used })
    }

    async fn refund(&self, user_id: &str, kind: QuotaKind, day_bucket: NaiveDate) -> Result<()> {
        let mut counters = self.counters.lock().expect("quota store poisoned");
        if let Some(used) = counters.get_mut(&(user_id.to_string(), kind, day_bucket)) {
            *used = (*used - 1).max(0);
        }
        Ok(())
    }

    async fn used(&self, user_id: &str, kind: QuotaKind, day_bucket: NaiveDate) -> Result<i64> {
        let counters = self.counters.lock().expect("quota store poisoned");
        Ok(*counters
            .get(&(user_id.to_string(), kind, day_bucket))
            .unwrap_or(&0))
    }
}

/// Profile pool + subscription status backed by one map, like the Postgres
/// implementation where both live on the profile row.
#[derive(Debug, Clone, Default)]
pub struct MemoryProfilePool {
    profiles: Arc<Mutex<HashMap<String, Profile>>>,
}

impl MemoryProfilePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, profile: Profile) {
        let mut profiles = self.profiles.lock().expect("profile pool poisoned");
        profiles.insert(profile.user_id.clone(), profile);
    }
}

impl ProfilePool for MemoryProfilePool {
    async fn get(&self, user_id: &str) -> Result<Option<Profile>> {
        let profiles = self.profiles.lock().expect("profile pool poisoned");
        Ok(profiles.get(user_id).cloned())
    }

    async fn fetch_page(
        &self,
        criteria: &FetchCriteria,
        page_token: Option<i64>,
        limit: i64,
    ) -> Result<(Vec<Profile>, Option<i64>)> {
        let profiles = self.profiles.lock().expect("profile pool poisoned");
        let mut eligible: Vec<Profile> = profiles
            .values()
            .filter(|p| p.age >= criteria.min_age && p.age <= criteria.max_age)
            .cloned()
            .collect();
        eligible.sort_by(|x, y| {
            y.last_active_at
                .cmp(&x.last_active_at)
                .then_with(|| x.user_id.cmp(&y.user_id))
        });

        let offset = page_token.unwrap_or(0).max(0) as usize;
        let page: Vec<Profile> = eligible.into_iter().skip(offset).take(limit as usize).collect();
        let next = if page.len() == limit as usize {
            Some(offset as i64 + limit)
        } else {
            None
        };
        Ok((page, next))
    }
}

impl SubscriptionStatus for MemoryProfilePool {
    async fn tier_of(&self, user_id: &str) -> Result<Option<SubscriptionTier>> {
        let profiles = self.profiles.lock().expect("profile pool poisoned");
        Ok(profiles.get(user_id).map(|p| p.tier))
    }
}

/// Chat store double: idempotent per pair, with an injectable failure for
/// exercising the reconciliation path.
#[derive(Debug, Clone, Default)]
pub struct MemoryConversationStore {
    conversations: Arc<Mutex<HashMap<PairKey, Uuid>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn conversation_count(&self) -> usize {
        self.conversations
            .lock()
            .expect("conversation store poisoned")
            .len()
    }
}

impl ConversationStore for MemoryConversationStore {
    async fn create_conversation(&self, pair: &PairKey) -> Result<Uuid> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("chat store unreachable"));
        }
        let mut conversations = self.conversations.lock().expect("conversation store poisoned");
        Ok(*conversations.entry(pair.clone()).or_insert_with(Uuid::new_v4))
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryNotifier {
    delivered: Arc<AtomicUsize>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::SeqCst)
    }
}

impl NotificationDispatch for MemoryNotifier {
    async fn notify_match(&self, _pair: &PairKey, _match_id: Uuid) {
        self.delivered.fetch_add(1, Ordering::SeqCst);
    }
}

/// Minimal valid profile for tests; tweak fields after construction.
pub fn sample_profile(user_id: &str) -> Profile {
    Profile {
        user_id: user_id.to_string(),
        display_name: user_id.to_uppercase(),
        age: 30,
        latitude: 40.0,
        longitude: -74.0,
        interests: vec!["hiking".to_string(), "film".to_string()],
        intention: Intention::Relationship,
        smoking: None,
        drinking: None,
        children: None,
        religion: None,
        height_cm: Some(175),
        photo_count: 3,
        verified: true,
        tier: SubscriptionTier::Free,
        last_active_at: Utc::now(),
        created_at: Utc::now(),
    }
}
