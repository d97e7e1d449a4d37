pub mod matches;
pub mod profile;
pub mod quota;
pub mod swipe;

pub use matches::{Match, PairKey};
pub use profile::{CandidateView, DiscoveryFilters, Intention, Profile, SubscriptionTier};
pub use quota::{QuotaDenial, QuotaKind, QuotaSnapshot};
pub use swipe::{DiscoveryOutcome, RewindOutcome, SwipeDecision, SwipeKind, SwipeOutcome};
