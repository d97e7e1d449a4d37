//! Push/notification dispatch. Fire-and-forget: a missed notification is
//! never worth failing a match over, so failures are logged and dropped.

use reqwest::Client;
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::models::PairKey;
use crate::store::NotificationDispatch;

#[derive(Debug, Clone)]
pub struct NotificationService {
    client: Client,
    base_url: String,
}

impl NotificationService {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }
}

#[derive(Debug, Serialize)]
struct MatchNotification<'a> {
    user_a: &'a str,
    user_b: &'a str,
    match_id: Uuid,
}

impl NotificationDispatch for NotificationService {
    async fn notify_match(&self, pair: &PairKey, match_id: Uuid) {
        let result = self
            .client
            .post(format!("{}/notifications/match", self.base_url))
            .json(&MatchNotification {
                user_a: pair.a(),
                user_b: pair.b(),
                match_id,
            })
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                warn!(%match_id, "match notification rejected: {}", response.status());
            }
            Err(err) => {
                warn!(%match_id, "match notification failed: {err:#}");
            }
        }
    }
}
