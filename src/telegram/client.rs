//! Bot API HTTP client

use super::types::{ApiResponse, Update, User};
use crate::runtime::Outbox;
use crate::state_machine::ChatId;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Long-poll duration passed to `getUpdates`
const LONG_POLL_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum TelegramError {
    /// Transport failure; the URL is stripped since it embeds the bot token
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),
    #[error("Bot API error {code}: {description}")]
    Api { code: i64, description: String },
    #[error("Bot API response had no result")]
    MissingResult,
}

impl From<reqwest::Error> for TelegramError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.without_url())
    }
}

pub struct TelegramClient {
    client: Client,
    base_url: String,
}

impl TelegramClient {
    pub fn new(api_url: &str, token: &str) -> Result<Self, TelegramError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(LONG_POLL_SECS + 30))
            .build()?;

        Ok(Self {
            client,
            base_url: format!("{}/bot{token}", api_url.trim_end_matches('/')),
        })
    }

    async fn call<B, T>(&self, method: &str, body: &B) -> Result<T, TelegramError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response: ApiResponse<T> = self
            .client
            .post(format!("{}/{method}", self.base_url))
            .json(body)
            .send()
            .await?
            .json()
            .await?;

        if !response.ok {
            return Err(TelegramError::Api {
                code: response.error_code.unwrap_or_default(),
                description: response.description.unwrap_or_default(),
            });
        }
        response.result.ok_or(TelegramError::MissingResult)
    }

    /// The bot's own account; used as a startup credential check
    pub async fn get_me(&self) -> Result<User, TelegramError> {
        self.call("getMe", &json!({})).await
    }

    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, TelegramError> {
        self.call(
            "getUpdates",
            &json!({
                "offset": offset,
                "timeout": LONG_POLL_SECS,
                "allowed_updates": ["message"],
            }),
        )
        .await
    }

    pub async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<(), TelegramError> {
        let _: serde_json::Value = self
            .call("sendMessage", &json!({ "chat_id": chat_id.0, "text": text }))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Outbox for TelegramClient {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<(), String> {
        self.send_message(chat_id, text)
            .await
            .map_err(|e| e.to_string())
    }
}
