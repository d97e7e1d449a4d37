//! Compatibility scoring. Pure arithmetic over two profiles; used only for
//! ordering and display, never for gating.

use std::collections::HashSet;

use crate::constants::*;
use crate::models::Profile;

/// Term weights for the compatibility score. Configuration, not business law,
/// but the three terms must sum to 1.0 so scores stay in [0, 1].
#[derive(Debug, Clone, Copy)]
pub struct ScoreWeights {
    pub interests: f64,
    pub intention: f64,
    pub distance: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            interests: SCORE_WEIGHT_INTERESTS,
            intention: SCORE_WEIGHT_INTENTION,
            distance: SCORE_WEIGHT_DISTANCE,
        }
    }
}

impl ScoreWeights {
    pub fn validate(&self) -> Result<(), String> {
        if self.interests < 0.0 || self.intention < 0.0 || self.distance < 0.0 {
            return Err("score weights must be non-negative".to_string());
        }
        let sum = self.interests + self.intention + self.distance;
        if (sum - 1.0).abs() > 1e-9 {
            return Err(format!("score weights must sum to 1.0, got {sum}"));
        }
        Ok(())
    }
}

/// Weighted compatibility in [0, 1]. Total and deterministic for any two
/// valid profiles.
pub fn score(weights: &ScoreWeights, user: &Profile, candidate: &Profile) -> f64 {
    let interests = interest_overlap(&user.interests, &candidate.interests);
    let intention = if user.intention.compatible_with(candidate.intention) {
        1.0
    } else {
        0.0
    };
    let distance_km = user.distance_km(candidate);
    let distance = 1.0 / (1.0 + distance_km / SCORE_DISTANCE_HALF_KM);

    (weights.interests * interests + weights.intention * intention + weights.distance * distance)
        .clamp(0.0, 1.0)
}

/// Jaccard ratio of the two interest sets. Empty-over-empty is 0, not NaN.
fn interest_overlap(a: &[String], b: &[String]) -> f64 {
    let a: HashSet<&str> = a.iter().map(String::as_str).collect();
    let b: HashSet<&str> = b.iter().map(String::as_str).collect();
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / union as f64
}
