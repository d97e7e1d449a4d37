pub mod connection;
pub mod matches;
pub mod migrations;
pub mod profiles;
pub mod quotas;
pub mod swipes;

pub use connection::{DatabaseConfig, get_db_pool};
pub use matches::PgMatchStore;
pub use profiles::PgProfilePool;
pub use quotas::PgQuotaStore;
pub use swipes::PgSwipeStore;
