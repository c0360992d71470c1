//! Response orchestration
//!
//! Turns one classified message into zero, one or two inference calls and
//! exactly one reply (or none for a repeated album notification).

use crate::gateway::MessagingGateway;
use crate::ledger::GroupErrorLedger;
use crate::messages::{
    fit_reply, API_ERROR_MESSAGE, OTHER_ERROR_MESSAGE, PHOTOS_ERROR_MESSAGE, PHOTO_ERROR_MESSAGE,
    WELCOME_MESSAGE,
};
use crate::update::{classify, InboundMessage, IncomingUpdate, ProcessingOutcome};
use cheatsheet_core::inference::{CompletionProvider, RecognitionProvider};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Which reply was sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    /// Welcome/help text
    Welcome,
    /// Generated answer
    Answer,
    /// Completion failed
    ApiError,
    /// Photo download or recognition failed
    PhotoError,
    /// Album notice
    MultiplePhotos,
    /// Neither text nor photo
    Unsupported,
}

impl ReplyKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Welcome => "welcome",
            Self::Answer => "answer",
            Self::ApiError => "api_error",
            Self::PhotoError => "photo_error",
            Self::MultiplePhotos => "multiple_photos",
            Self::Unsupported => "unsupported",
        }
    }
}

/// Terminal state of one handled message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleOutcome {
    /// One reply was attempted
    Replied(ReplyKind),
    /// Album already notified, nothing sent
    Suppressed,
}

/// Routes messages to the inference services and sends the reply
pub struct ResponseOrchestrator {
    gateway: Arc<dyn MessagingGateway>,
    completion: Arc<dyn CompletionProvider>,
    recognition: Arc<dyn RecognitionProvider>,
    ledger: GroupErrorLedger,
    typing_indicator: bool,
}

impl ResponseOrchestrator {
    /// Create an orchestrator; the typing indicator is enabled by default
    #[must_use]
    pub fn new(
        gateway: Arc<dyn MessagingGateway>,
        completion: Arc<dyn CompletionProvider>,
        recognition: Arc<dyn RecognitionProvider>,
        ledger: GroupErrorLedger,
    ) -> Self {
        Self {
            gateway,
            completion,
            recognition,
            ledger,
            typing_indicator: true,
        }
    }

    /// Enable or disable the "typing" chat action
    #[must_use]
    pub const fn with_typing_indicator(mut self, enabled: bool) -> Self {
        self.typing_indicator = enabled;
        self
    }

    /// Handle a whole update; updates without a message are ignored.
    pub async fn handle_update(&self, update: &IncomingUpdate) -> Option<HandleOutcome> {
        match update.message.as_ref() {
            Some(message) => Some(self.handle(message).await),
            None => {
                debug!(update_id = ?update.update_id, "Update has no message, skipping");
                None
            }
        }
    }

    /// Handle one message to completion.
    #[instrument(skip_all, fields(chat_id = message.chat.id, message_id = message.message_id))]
    pub async fn handle(&self, message: &InboundMessage) -> HandleOutcome {
        self.show_typing(message).await;

        let outcome = match classify(message) {
            ProcessingOutcome::Command => {
                self.reply(message, ReplyKind::Welcome, WELCOME_MESSAGE)
                    .await
            }
            ProcessingOutcome::Unsupported => {
                self.reply(message, ReplyKind::Unsupported, OTHER_ERROR_MESSAGE)
                    .await
            }
            ProcessingOutcome::GroupedPhoto(group_id) => {
                if self.ledger.try_claim(group_id).await {
                    self.reply(message, ReplyKind::MultiplePhotos, PHOTOS_ERROR_MESSAGE)
                        .await
                } else {
                    debug!(
                        media_group_id = group_id,
                        suppressed_total = self.ledger.suppressed_count(),
                        tracked_albums = self.ledger.entry_count(),
                        "Album already notified"
                    );
                    HandleOutcome::Suppressed
                }
            }
            ProcessingOutcome::PlainText(question) => self.answer(message, question).await,
            ProcessingOutcome::SinglePhoto(file_id) => self.answer_photo(message, file_id).await,
        };

        if let HandleOutcome::Replied(kind) = outcome {
            info!(reply = kind.as_str(), "Update handled");
        }
        outcome
    }

    async fn answer_photo(&self, message: &InboundMessage, file_id: &str) -> HandleOutcome {
        let image = match self.gateway.fetch_file(file_id).await {
            Ok(image) => image,
            Err(e) => {
                warn!("Failed to download photo: {}", e);
                return self
                    .reply(message, ReplyKind::PhotoError, PHOTO_ERROR_MESSAGE)
                    .await;
            }
        };

        match self.recognition.recognize(&image).await {
            Ok(question) => self.answer(message, &question).await,
            Err(e) => {
                warn!("Recognition failed: {}", e);
                self.reply(message, ReplyKind::PhotoError, PHOTO_ERROR_MESSAGE)
                    .await
            }
        }
    }

    async fn answer(&self, message: &InboundMessage, question: &str) -> HandleOutcome {
        match self.completion.complete(question).await {
            Ok(answer) => {
                self.reply(message, ReplyKind::Answer, &fit_reply(&answer))
                    .await
            }
            Err(e) => {
                warn!("Completion failed: {}", e);
                self.reply(message, ReplyKind::ApiError, API_ERROR_MESSAGE)
                    .await
            }
        }
    }

    async fn reply(&self, message: &InboundMessage, kind: ReplyKind, text: &str) -> HandleOutcome {
        if let Err(e) = self
            .gateway
            .send_reply(message.chat.id, message.message_id, text)
            .await
        {
            error!(reply = kind.as_str(), "Failed to send reply: {}", e);
        }
        HandleOutcome::Replied(kind)
    }

    async fn show_typing(&self, message: &InboundMessage) {
        if !self.typing_indicator {
            return;
        }
        if let Some(group_id) = message.media_group_id.as_deref() {
            if self.ledger.is_recorded(group_id).await {
                return;
            }
        }
        if let Err(e) = self.gateway.send_typing(message.chat.id).await {
            debug!("Typing indicator not sent: {}", e);
        }
    }
}
