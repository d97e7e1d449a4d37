use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use axum::{
    Router,
    routing::{get, post, put},
};
use ember::db::{self, PgMatchStore, PgProfilePool, PgQuotaStore, PgSwipeStore};
use ember::handlers::{self, AppState, PgEngine};
use ember::services::{ChatService, Engine, NotificationService, QuotaPolicy, ScoreWeights};
use ember::{Config, get_db_pool, utils};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    utils::init_logging();

    let config = Config::from_env()?;
    let db_config = db::DatabaseConfig::from_env()?;
    let pool = get_db_pool(&db_config).await?;

    // Run migrations
    db::migrations::run_migrations(&pool).await?;

    let port = config.port;
    let app = create_router(pool, config)?;

    let listener = tokio::net::TcpListener::bind(&format!("0.0.0.0:{}", port)).await?;
    tracing::info!("Server running on port {}", port);

    axum::serve(listener, app).await?;

    Ok(())
}

fn create_router(pool: PgPool, config: Config) -> anyhow::Result<Router> {
    let cors_layer = create_cors_layer();
    let engine = build_engine(pool, &config)?;
    let app_state = AppState {
        engine: Arc::new(engine),
    };

    Ok(Router::new()
        .route("/health", get(health_check))
        // Discovery
        .route("/api/discovery/next/{user_id}", get(handlers::discover_next))
        .route("/api/discovery/rewind/{user_id}", post(handlers::rewind))
        .route("/api/discovery/filters/{user_id}", put(handlers::set_filters))
        // Swipes
        .route("/api/swipes", post(handlers::submit_swipe))
        // Quota
        .route("/api/quota/{user_id}", get(handlers::current_quota))
        .layer(cors_layer)
        .with_state(app_state))
}

fn build_engine(pool: PgPool, config: &Config) -> anyhow::Result<PgEngine> {
    let weights = ScoreWeights::default();
    weights
        .validate()
        .map_err(|reason| anyhow::anyhow!("bad score weights: {reason}"))?;

    Ok(Engine::new(
        PgSwipeStore::new(pool.clone()),
        PgMatchStore::new(pool.clone()),
        PgQuotaStore::new(pool.clone()),
        PgProfilePool::new(pool.clone()),
        PgProfilePool::new(pool),
        ChatService::new(config.chat_service_url.clone()),
        NotificationService::new(config.notify_service_url.clone()),
        QuotaPolicy::new(config.quota_timezone),
        weights,
    ))
}

fn create_cors_layer() -> CorsLayer {
    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers(Any)
        .allow_credentials(false);

    // ALLOWED_ORIGINS restricts CORS to a comma-separated list of domains;
    // unset means permissive, for development.
    if let Ok(cors_origins) = std::env::var("ALLOWED_ORIGINS") {
        let origins: Vec<HeaderValue> = cors_origins
            .split(',')
            .filter_map(|origin| {
                let trimmed = origin.trim();
                if !trimmed.is_empty() {
                    trimmed.parse().ok()
                } else {
                    None
                }
            })
            .collect();

        if !origins.is_empty() {
            cors = cors.allow_origin(origins);
        } else {
            cors = cors.allow_origin(Any);
        }
    } else {
        cors = cors.allow_origin(Any);
    }

    cors
}

async fn health_check() -> &'static str {
    "OK"
}
