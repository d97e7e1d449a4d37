//! Periodic reconciliation job: finds matches that still lack a conversation
//! (the chat store was unreachable when they formed) and retries creation.

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use ember::constants::{RECONCILE_BATCH_SIZE, RECONCILE_INTERVAL_SECS};
use ember::db::{DatabaseConfig, PgMatchStore};
use ember::services::{ChatService, reconcile_conversations};
use ember::utils::{Config, init_logging};
use ember::get_db_pool;
use tokio::time;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(about = "Backfills conversations for matches that lack one")]
struct Args {
    /// Seconds between sweeps
    #[arg(long, default_value_t = RECONCILE_INTERVAL_SECS)]
    interval_secs: u64,

    /// Matches examined per sweep
    #[arg(long, default_value_t = RECONCILE_BATCH_SIZE)]
    batch_size: i64,

    /// Run a single sweep and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let args = Args::parse();

    info!("Starting conversation reconciler...");

    let config = Config::from_env()?;
    let db_config = DatabaseConfig::from_env()?;
    let pool = get_db_pool(&db_config).await?;

    let matches = PgMatchStore::new(pool);
    let chat = ChatService::new(config.chat_service_url.clone());

    let mut interval = time::interval(Duration::from_secs(args.interval_secs));
    let mut iter_count: usize = 0;

    loop {
        interval.tick().await;
        iter_count += 1;

        match reconcile_conversations(&matches, &chat, args.batch_size).await {
            Ok(0) => {
                info!("Sweep {} found nothing to repair", iter_count);
            }
            Ok(repaired) => {
                info!("Sweep {} backfilled {} conversation(s)", iter_count, repaired);
            }
            Err(e) => {
                error!("Sweep {} failed: {e:#}", iter_count);
            }
        }

        if args.once {
            break;
        }
    }

    Ok(())
}
