//! Outbound Telegram operations used by the orchestrator.

use async_trait::async_trait;
use std::time::Duration;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, FileId, MessageId, ReplyParameters};
use thiserror::Error;
use tracing::debug;

/// Errors returned by the messaging gateway
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Bot API request failed
    #[error("Telegram request error: {0}")]
    Request(#[from] teloxide::RequestError),
    /// File content download failed
    #[error("Telegram download error: {0}")]
    Download(#[from] teloxide::DownloadError),
}

/// Messaging platform operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    /// Show the "typing" indicator in a chat
    async fn send_typing(&self, chat_id: i64) -> Result<(), GatewayError>;
    /// Send `text` to `chat_id` as a reply to `reply_to`
    async fn send_reply(&self, chat_id: i64, reply_to: i32, text: &str)
        -> Result<(), GatewayError>;
    /// Resolve a file id and download its content
    async fn fetch_file(&self, file_id: &str) -> Result<Vec<u8>, GatewayError>;
}

/// Gateway backed by the Telegram Bot API
#[derive(Clone)]
pub struct TelegramGateway {
    bot: Bot,
}

impl TelegramGateway {
    /// Create a gateway whose HTTP calls are bounded by `timeout`
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(token: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = teloxide::net::default_reqwest_settings()
            .timeout(timeout)
            .build()?;
        Ok(Self::from_bot(Bot::with_client(token, client)))
    }

    /// Wrap an existing bot
    #[must_use]
    pub const fn from_bot(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl MessagingGateway for TelegramGateway {
    async fn send_typing(&self, chat_id: i64) -> Result<(), GatewayError> {
        self.bot
            .send_chat_action(ChatId(chat_id), ChatAction::Typing)
            .await?;
        Ok(())
    }

    async fn send_reply(
        &self,
        chat_id: i64,
        reply_to: i32,
        text: &str,
    ) -> Result<(), GatewayError> {
        self.bot
            .send_message(ChatId(chat_id), text)
            .reply_parameters(ReplyParameters::new(MessageId(reply_to)))
            .await?;
        Ok(())
    }

    async fn fetch_file(&self, file_id: &str) -> Result<Vec<u8>, GatewayError> {
        let file = self.bot.get_file(FileId(file_id.to_string())).await?;
        let mut buf = Vec::new();
        self.bot.download_file(&file.path, &mut buf).await?;
        debug!(size = buf.len(), "Downloaded file from Telegram");
        Ok(buf)
    }
}
