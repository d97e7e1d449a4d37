//! Candidate filtering: exclusion sets, conjunctive preference filters, and
//! score-ordered queue construction.

use std::collections::HashSet;

use chrono::{TimeDelta, Utc};

use crate::constants::*;
use crate::error::EngineError;
use crate::models::{CandidateView, DiscoveryFilters, Profile};
use crate::services::scorer::{self, ScoreWeights};
use crate::store::{FetchCriteria, MatchStore, ProfilePool, SwipeStore};

#[derive(Debug, Clone)]
pub struct CandidateFilter<P, S, M> {
    pool: P,
    swipes: S,
    matches: M,
    weights: ScoreWeights,
}

impl<P, S, M> CandidateFilter<P, S, M>
where
    P: ProfilePool,
    S: SwipeStore,
    M: MatchStore,
{
    pub fn new(pool: P, swipes: S, matches: M, weights: ScoreWeights) -> Self {
        Self {
            pool,
            swipes,
            matches,
            weights,
        }
    }

    /// Builds an ordered, deduplicated candidate queue for `user_id`.
    /// Restartable: call again after preference changes; the exclusion set is
    /// re-read every time so previously swiped or matched profiles never
    /// resurface.
    pub async fn build_queue(
        &self,
        user_id: &str,
        filters: &DiscoveryFilters,
    ) -> Result<Vec<CandidateView>, EngineError> {
        let user = self
            .pool
            .get(user_id)
            .await
            .map_err(EngineError::Storage)?
            .ok_or_else(|| EngineError::UnknownUser(user_id.to_string()))?;

        let advanced = user.tier.has_advanced_filters();

        let mut excluded: HashSet<String> = self
            .swipes
            .swiped_targets(user_id)
            .await
            .map_err(EngineError::Storage)?
            .into_iter()
            .collect();
        excluded.extend(
            self.matches
                .matched_user_ids(user_id)
                .await
                .map_err(EngineError::Storage)?,
        );
        excluded.insert(user_id.to_string());

        let criteria = FetchCriteria {
            min_age: filters.min_age,
            max_age: filters.max_age,
        };
        let now = Utc::now();

        let mut scored: Vec<(Profile, f64)> = Vec::new();
        let mut page_token = None;
        for _ in 0..MAX_FILTER_PAGES {
            let (page, next) = self
                .pool
                .fetch_page(&criteria, page_token, PROFILE_PAGE_SIZE)
                .await
                .map_err(EngineError::Storage)?;

            for profile in page {
                if excluded.contains(&profile.user_id) {
                    continue;
                }
                if !passes(&user, &profile, filters, advanced, now) {
                    continue;
                }
                let s = scorer::score(&self.weights, &user, &profile);
                scored.push((profile, s));
            }

            page_token = next;
            if scored.len() >= DISCOVERY_QUEUE_TARGET || page_token.is_none() {
                break;
            }
        }

        // Descending score; ties broken by most-recently-active, then id, so
        // the ordering is deterministic.
        scored.sort_by(|(pa, sa), (pb, sb)| {
            sb.total_cmp(sa)
                .then_with(|| pb.last_active_at.cmp(&pa.last_active_at))
                .then_with(|| pa.user_id.cmp(&pb.user_id))
        });

        Ok(scored
            .into_iter()
            .map(|(profile, s)| CandidateView {
                distance_km: user.distance_km(&profile),
                user_id: profile.user_id,
                display_name: profile.display_name,
                age: profile.age,
                interests: profile.interests,
                intention: profile.intention,
                verified: profile.verified,
                photo_count: profile.photo_count,
                score: s,
            })
            .collect())
    }
}

/// Conjunctive filter check. `advanced` gates the lifestyle/value filters:
/// Free-tier users can set them, but they are silently ignored.
fn passes(
    user: &Profile,
    candidate: &Profile,
    filters: &DiscoveryFilters,
    advanced: bool,
    now: chrono::DateTime<Utc>,
) -> bool {
    if candidate.age < filters.min_age || candidate.age > filters.max_age {
        return false;
    }
    if user.distance_km(candidate) > filters.max_distance_km {
        return false;
    }
    if !advanced {
        return true;
    }

    if let Some(smoking) = &filters.smoking {
        if candidate.smoking.as_deref() != Some(smoking.as_str()) {
            return false;
        }
    }
    if let Some(drinking) = &filters.drinking {
        if candidate.drinking.as_deref() != Some(drinking.as_str()) {
            return false;
        }
    }
    if let Some(children) = &filters.children {
        if candidate.children.as_deref() != Some(children.as_str()) {
            return false;
        }
    }
    if let Some(religion) = &filters.religion {
        if candidate.religion.as_deref() != Some(religion.as_str()) {
            return false;
        }
    }
    if filters.verified_only && !candidate.verified {
        return false;
    }
    if let Some(days) = filters.active_within_days {
        if candidate.last_active_at < now - TimeDelta::days(days) {
            return false;
        }
    }
    if let Some(min_photos) = filters.min_photo_count {
        if candidate.photo_count < min_photos {
            return false;
        }
    }
    if let Some(min_height) = filters.min_height_cm {
        if candidate.height_cm.is_none_or(|h| h < min_height) {
            return false;
        }
    }
    if let Some(max_height) = filters.max_height_cm {
        if candidate.height_cm.is_none_or(|h| h > max_height) {
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PairKey, SubscriptionTier, SwipeDecision, SwipeKind};
    use crate::store::memory::{
        MemoryMatchStore, MemoryProfilePool, MemorySwipeStore, sample_profile,
    };

    fn filter() -> (
        CandidateFilter<MemoryProfilePool, MemorySwipeStore, MemoryMatchStore>,
        MemoryProfilePool,
        MemorySwipeStore,
        MemoryMatchStore,
    ) {
        let pool = MemoryProfilePool::new();
        let swipes = MemorySwipeStore::new();
        let matches = MemoryMatchStore::new();
        let filter = CandidateFilter::new(
            pool.clone(),
            swipes.clone(),
            matches.clone(),
            ScoreWeights::default(),
        );
        (filter, pool, swipes, matches)
    }

    #[tokio::test]
    async fn excludes_self_swiped_and_matched() {
        let (filter, pool, swipes, matches) = filter();
        pool.insert(sample_profile("me"));
        pool.insert(sample_profile("swiped"));
        pool.insert(sample_profile("matched"));
        pool.insert(sample_profile("fresh"));

        swipes
            .record(&SwipeDecision::new("me", "swiped", SwipeKind::Pass))
            .await
            .unwrap();
        matches.create(&PairKey::new("me", "matched")).await.unwrap();

        let queue = filter
            .build_queue("me", &DiscoveryFilters::default())
            .await
            .unwrap();
        let ids: Vec<&str> = queue.iter().map(|c| c.user_id.as_str()).collect();
        assert_eq!(ids, vec!["fresh"]);
    }

    #[tokio::test]
    async fn age_and_distance_always_apply() {
        let (filter, pool, _, _) = filter();
        pool.insert(sample_profile("me"));

        let mut too_old = sample_profile("too_old");
        too_old.age = 60;
        pool.insert(too_old);

        let mut too_far = sample_profile("too_far");
        too_far.latitude = 48.0; // ~900 km north
        pool.insert(too_far);

        pool.insert(sample_profile("nearby"));

        let filters = DiscoveryFilters {
            min_age: 25,
            max_age: 35,
            max_distance_km: 50.0,
            ..DiscoveryFilters::default()
        };
        let queue = filter.build_queue("me", &filters).await.unwrap();
        let ids: Vec<&str> = queue.iter().map(|c| c.user_id.as_str()).collect();
        assert_eq!(ids, vec!["nearby"]);
    }

    #[tokio::test]
    async fn advanced_filters_ignored_for_free_honored_for_premium() {
        let (filter, pool, _, _) = filter();

        let mut free_user = sample_profile("free_user");
        free_user.tier = SubscriptionTier::Free;
        pool.insert(free_user);

        let mut premium_user = sample_profile("premium_user");
        premium_user.tier = SubscriptionTier::Premium;
        pool.insert(premium_user);

        let mut buddhist = sample_profile("buddhist");
        buddhist.religion = Some("buddhist".to_string());
        pool.insert(buddhist);

        let mut atheist = sample_profile("atheist");
        atheist.religion = Some("atheist".to_string());
        pool.insert(atheist);

        let filters = DiscoveryFilters {
            religion: Some("buddhist".to_string()),
            ..DiscoveryFilters::default()
        };

        // Free tier: the religion filter is accepted but not applied.
        let queue = filter.build_queue("free_user", &filters).await.unwrap();
        assert!(queue.iter().any(|c| c.user_id == "atheist"));
        assert!(queue.iter().any(|c| c.user_id == "buddhist"));

        // Premium tier: only matching-religion candidates come back.
        let queue = filter.build_queue("premium_user", &filters).await.unwrap();
        let ids: Vec<&str> = queue.iter().map(|c| c.user_id.as_str()).collect();
        assert!(ids.contains(&"buddhist"));
        assert!(!ids.contains(&"atheist"));
    }

    #[tokio::test]
    async fn verified_and_photo_filters_are_conjunctive_for_premium() {
        let (filter, pool, _, _) = filter();

        let mut me = sample_profile("me");
        me.tier = SubscriptionTier::Vip;
        pool.insert(me);

        let mut unverified = sample_profile("unverified");
        unverified.verified = false;
        pool.insert(unverified);

        let mut few_photos = sample_profile("few_photos");
        few_photos.photo_count = 1;
        pool.insert(few_photos);

        pool.insert(sample_profile("passes_all"));

        let filters = DiscoveryFilters {
            verified_only: true,
            min_photo_count: Some(2),
            ..DiscoveryFilters::default()
        };
        let queue = filter.build_queue("me", &filters).await.unwrap();
        let ids: Vec<&str> = queue.iter().map(|c| c.user_id.as_str()).collect();
        assert_eq!(ids, vec!["passes_all"]);
    }

    #[tokio::test]
    async fn ordering_is_by_score_then_recency_then_id() {
        let (filter, pool, _, _) = filter();
        pool.insert(sample_profile("me"));

        // Same score as "tied_b" but more recently active.
        let mut tied_a = sample_profile("tied_a");
        tied_a.last_active_at = Utc::now();
        pool.insert(tied_a);

        let mut tied_b = sample_profile("tied_b");
        tied_b.last_active_at = Utc::now() - TimeDelta::days(2);
        pool.insert(tied_b);

        // Shares no interests, so it scores lower.
        let mut low = sample_profile("aaa_low");
        low.interests = vec!["golf".to_string()];
        pool.insert(low);

        let queue = filter
            .build_queue("me", &DiscoveryFilters::default())
            .await
            .unwrap();
        let ids: Vec<&str> = queue.iter().map(|c| c.user_id.as_str()).collect();
        assert_eq!(ids, vec!["tied_a", "tied_b", "aaa_low"]);
    }

    #[tokio::test]
    async fn unknown_user_is_rejected() {
        let (filter, _, _, _) = filter();
        let err = filter
            .build_queue("ghost", &DiscoveryFilters::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownUser(_)));
    }
}
