//! Inbound webhook updates and their classification.
//!
//! Only the fields the bot reads are modelled; everything else in the Telegram
//! update is ignored during deserialization.

use serde::Deserialize;

/// Commands answered with the welcome text
pub const GLOBAL_COMMANDS: &[&str] = &["/start", "/help"];

/// Update envelope delivered to the webhook
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingUpdate {
    /// Telegram update id
    #[serde(default)]
    pub update_id: Option<i64>,
    /// New incoming message, absent for edits, callbacks and other update kinds
    #[serde(default)]
    pub message: Option<InboundMessage>,
}

/// Message part of an update
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct InboundMessage {
    /// Message id inside the chat, used to thread the reply
    pub message_id: i32,
    /// Chat the message came from
    pub chat: Chat,
    /// Message text
    #[serde(default)]
    pub text: Option<String>,
    /// Photo sizes in ascending resolution order
    #[serde(default)]
    pub photo: Option<Vec<PhotoSize>>,
    /// Album identifier shared by photos sent together
    #[serde(default)]
    pub media_group_id: Option<String>,
}

/// Chat reference
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct Chat {
    /// Chat id
    pub id: i64,
}

/// One resolution of a photo
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PhotoSize {
    /// File id to download the image with
    pub file_id: String,
    /// Stable unique id of the file
    #[serde(default)]
    pub file_unique_id: Option<String>,
    /// Width in pixels
    #[serde(default)]
    pub width: u32,
    /// Height in pixels
    #[serde(default)]
    pub height: u32,
}

/// What the orchestrator has to do with a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingOutcome<'a> {
    /// `/start` or `/help`
    Command,
    /// Free text question
    PlainText(&'a str),
    /// A single photo; carries the file id of the largest size
    SinglePhoto(&'a str),
    /// A photo that belongs to an album
    GroupedPhoto(&'a str),
    /// Neither text nor a usable photo
    Unsupported,
}

/// Classify a message. Pure function of the message shape.
///
/// Text wins over photo. Album photos are never processed individually, and a
/// `photo` field without any sizes counts as unsupported.
#[must_use]
pub fn classify(message: &InboundMessage) -> ProcessingOutcome<'_> {
    if let Some(text) = message.text.as_deref() {
        return if GLOBAL_COMMANDS.contains(&text) {
            ProcessingOutcome::Command
        } else {
            ProcessingOutcome::PlainText(text)
        };
    }

    let Some(photo) = message.photo.as_deref() else {
        return ProcessingOutcome::Unsupported;
    };

    if let Some(group_id) = message.media_group_id.as_deref() {
        return ProcessingOutcome::GroupedPhoto(group_id);
    }

    // Telegram lists sizes smallest first
    photo
        .last()
        .map_or(ProcessingOutcome::Unsupported, |largest| {
            ProcessingOutcome::SinglePhoto(&largest.file_id)
        })
}
