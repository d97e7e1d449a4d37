use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::constants::*;
use crate::models::quota::QuotaKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "subscription_tier", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    Free,
    Premium,
    Vip,
}

impl SubscriptionTier {
    /// Daily allowance for a quota kind. `None` means unlimited.
    pub fn daily_limit(&self, kind: QuotaKind) -> Option<i64> {
        match (self, kind) {
            (SubscriptionTier::Free, QuotaKind::Like) => Some(FREE_DAILY_LIKES),
            (SubscriptionTier::Free, QuotaKind::SuperLike) => Some(FREE_DAILY_SUPER_LIKES),
            (SubscriptionTier::Premium, QuotaKind::Like) => Some(PREMIUM_DAILY_LIKES),
            (SubscriptionTier::Premium, QuotaKind::SuperLike) => Some(PREMIUM_DAILY_SUPER_LIKES),
            (SubscriptionTier::Vip, _) => None,
        }
    }

    /// Lifestyle/value filters are a paid feature. Free-tier users can set
    /// them but they are not applied.
    pub fn has_advanced_filters(&self) -> bool {
        matches!(self, SubscriptionTier::Premium | SubscriptionTier::Vip)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "intention", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Intention {
    Casual,
    Relationship,
    Friendship,
    Unsure,
}

impl Intention {
    /// Two declared intentions are compatible when they agree, or when either
    /// side is still undecided.
    pub fn compatible_with(&self, other: Intention) -> bool {
        *self == other || *self == Intention::Unsure || other == Intention::Unsure
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub user_id: String,
    pub display_name: String,
    pub age: i32,
    pub latitude: f64,
    pub longitude: f64,
    pub interests: Vec<String>,
    pub intention: Intention,
    pub smoking: Option<String>,
    pub drinking: Option<String>,
    pub children: Option<String>,
    pub religion: Option<String>,
    pub height_cm: Option<i32>,
    pub photo_count: i32,
    pub verified: bool,
    pub tier: SubscriptionTier,
    pub last_active_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    /// Great-circle distance to another profile in kilometers (haversine).
    pub fn distance_km(&self, other: &Profile) -> f64 {
        const EARTH_RADIUS_KM: f64 = 6371.0;
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = (other.latitude - self.latitude).to_radians();
        let dlon = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
    }
}

/// A user's discovery preferences. Age and distance always apply; the rest
/// only applies for Premium/Vip users and is silently ignored for Free.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryFilters {
    pub min_age: i32,
    pub max_age: i32,
    pub max_distance_km: f64,
    #[serde(default)]
    pub smoking: Option<String>,
    #[serde(default)]
    pub drinking: Option<String>,
    #[serde(default)]
    pub children: Option<String>,
    #[serde(default)]
    pub religion: Option<String>,
    #[serde(default)]
    pub verified_only: bool,
    #[serde(default)]
    pub active_within_days: Option<i64>,
    #[serde(default)]
    pub min_photo_count: Option<i32>,
    #[serde(default)]
    pub min_height_cm: Option<i32>,
    #[serde(default)]
    pub max_height_cm: Option<i32>,
}

impl Default for DiscoveryFilters {
    fn default() -> Self {
        Self {
            min_age: DEFAULT_MIN_AGE,
            max_age: DEFAULT_MAX_AGE,
            max_distance_km: DEFAULT_MAX_DISTANCE_KM,
            smoking: None,
            drinking: None,
            children: None,
            religion: None,
            verified_only: false,
            active_within_days: None,
            min_photo_count: None,
            min_height_cm: None,
            max_height_cm: None,
        }
    }
}

impl DiscoveryFilters {
    pub fn validate(&self) -> Result<(), String> {
        if self.min_age < MINIMUM_LEGAL_AGE {
            return Err(format!("min_age must be at least {}", MINIMUM_LEGAL_AGE));
        }
        if self.min_age > self.max_age {
            return Err("min_age must not exceed max_age".to_string());
        }
        if self.max_distance_km <= 0.0 {
            return Err("max_distance_km must be positive".to_string());
        }
        if let (Some(lo), Some(hi)) = (self.min_height_cm, self.max_height_cm) {
            if lo > hi {
                return Err("min_height_cm must not exceed max_height_cm".to_string());
            }
        }
        Ok(())
    }
}

/// What the presentation layer sees for one discovery candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateView {
    pub user_id: String,
    pub display_name: String,
    pub age: i32,
    pub distance_km: f64,
    pub interests: Vec<String>,
    pub intention: Intention,
    pub verified: bool,
    pub photo_count: i32,
    pub score: f64,
}
