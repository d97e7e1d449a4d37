// =============================================================================
// Ember Engine Constants
// =============================================================================
// All tunables used throughout the engine live here so they can be adjusted
// from a single location.

// =============================================================================
// QUOTA LIMITS (per day bucket)
// =============================================================================

/// Free tier daily like allowance
pub const FREE_DAILY_LIKES: i64 = 10;

/// Free tier daily super-like allowance
pub const FREE_DAILY_SUPER_LIKES: i64 = 1;

/// Premium tier daily like allowance
pub const PREMIUM_DAILY_LIKES: i64 = 100;

/// Premium tier daily super-like allowance
pub const PREMIUM_DAILY_SUPER_LIKES: i64 = 5;

// =============================================================================
// COMPATIBILITY SCORING
// =============================================================================

/// Weight of the interest-overlap (Jaccard) term
pub const SCORE_WEIGHT_INTERESTS: f64 = 0.5;

/// Weight of the declared-intention term
pub const SCORE_WEIGHT_INTENTION: f64 = 0.3;

/// Weight of the distance-decay term
pub const SCORE_WEIGHT_DISTANCE: f64 = 0.2;

/// Distance (km) at which the decay term halves
pub const SCORE_DISTANCE_HALF_KM: f64 = 50.0;

// =============================================================================
// DISCOVERY
// =============================================================================

/// Default preference bounds when a user has not set filters
pub const DEFAULT_MIN_AGE: i32 = 18;
pub const DEFAULT_MAX_AGE: i32 = 99;
pub const DEFAULT_MAX_DISTANCE_KM: f64 = 100.0;

/// Hard floor for the age filter
pub const MINIMUM_LEGAL_AGE: i32 = 18;

/// How many candidates a discovery queue aims to hold after a build
pub const DISCOVERY_QUEUE_TARGET: usize = 50;

/// Page size when pulling raw profiles from the pool
pub const PROFILE_PAGE_SIZE: i64 = 100;

/// Upper bound on pool pages consumed per queue build
pub const MAX_FILTER_PAGES: usize = 10;

/// How long a terminal Exhausted result stands before a refill is retried
pub const EXHAUSTED_RETRY_SECS: u64 = 300;

// =============================================================================
// RECONCILIATION
// =============================================================================

/// Matches fetched per reconciliation sweep
pub const RECONCILE_BATCH_SIZE: i64 = 50;

/// Default seconds between reconciliation sweeps
pub const RECONCILE_INTERVAL_SECS: u64 = 60;

// =============================================================================
// SERVER CONFIGURATION
// =============================================================================

/// Default server port if not specified in environment
pub const DEFAULT_SERVER_PORT: u16 = 3000;

/// Default quota day-bucket timezone (IANA name)
pub const DEFAULT_QUOTA_TIMEZONE: &str = "UTC";
