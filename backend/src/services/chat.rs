//! Client for the external conversation/chat store. The engine only ever
//! asks it to create a conversation for a matched pair; the chat service is
//! expected to be idempotent per unordered pair.

use anyhow::{Result, anyhow};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::PairKey;
use crate::store::ConversationStore;

#[derive(Debug, Clone)]
pub struct ChatService {
    client: Client,
    base_url: String,
}

impl ChatService {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateConversationRequest<'a> {
    user_a: &'a str,
    user_b: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreateConversationResponse {
    conversation_id: Uuid,
}

impl ConversationStore for ChatService {
    async fn create_conversation(&self, pair: &PairKey) -> Result<Uuid> {
        let response = self
            .client
            .post(format!("{}/conversations", self.base_url))
            .json(&CreateConversationRequest {
                user_a: pair.a(),
                user_b: pair.b(),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("chat store returned {}", response.status()));
        }

        let body: CreateConversationResponse = response.json().await?;
        Ok(body.conversation_id)
    }
}
