use anyhow::Result;
use chrono_tz::Tz;
use std::env;

use crate::constants::{DEFAULT_QUOTA_TIMEZONE, DEFAULT_SERVER_PORT};

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub chat_service_url: String,
    pub notify_service_url: String,
    pub quota_timezone: Tz,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let quota_timezone = env::var("QUOTA_TIMEZONE")
            .unwrap_or_else(|_| DEFAULT_QUOTA_TIMEZONE.to_string())
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("invalid QUOTA_TIMEZONE: {e}"))?;

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| DEFAULT_SERVER_PORT.to_string())
                .parse()
                .unwrap_or(DEFAULT_SERVER_PORT),
            chat_service_url: env::var("CHAT_SERVICE_URL")
                .map_err(|_| anyhow::anyhow!("CHAT_SERVICE_URL must be set"))?,
            notify_service_url: env::var("NOTIFY_SERVICE_URL")
                .map_err(|_| anyhow::anyhow!("NOTIFY_SERVICE_URL must be set"))?,
            quota_timezone,
        })
    }
}
