//! Minimal message abstraction consumed by the engine.
//!
//! The surrounding integration layer (chat client, console, test harness)
//! implements [`Message`]. The engine only reads the sender, body, content
//! kind and event type, and talks back through [`Message::reply`].

use crate::error::ReplyError;
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;

/// Content kind of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Text,
    Notice,
    Emote,
    Image,
    Video,
    Audio,
    File,
    Location,
}

impl ContentKind {
    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Notice => "notice",
            Self::Emote => "emote",
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::File => "file",
            Self::Location => "location",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "notice" => Ok(Self::Notice),
            "emote" => Ok(Self::Emote),
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            "audio" => Ok(Self::Audio),
            "file" => Ok(Self::File),
            "location" => Ok(Self::Location),
            other => Err(format!("unknown content kind: {other}")),
        }
    }
}

/// Event type tag carried by messages, commands and watchers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EventType {
    #[default]
    RoomMessage,
    Sticker,
}

/// An incoming chat message.
#[async_trait]
pub trait Message: Send + Sync {
    /// Identity of the sender.
    fn sender(&self) -> &str;

    /// Textual body.
    fn body(&self) -> &str;

    /// Content kind (text, notice, image, ...).
    fn kind(&self) -> ContentKind {
        ContentKind::Text
    }

    /// Event type this message was delivered as.
    fn event_type(&self) -> EventType {
        EventType::RoomMessage
    }

    /// Identity of the bot receiving the message.
    fn bot_id(&self) -> &str;

    /// Reply to the message's origin.
    async fn reply(&self, text: &str) -> Result<(), ReplyError>;
}

/// True when the bot itself sent the message.
#[inline]
pub fn is_self_sent(msg: &dyn Message) -> bool {
    msg.sender() == msg.bot_id()
}

/// Send a reply, logging delivery failures instead of propagating them.
pub(crate) async fn reply_logged(msg: &dyn Message, text: &str) {
    if let Err(e) = msg.reply(text).await {
        tracing::warn!(sender = %msg.sender(), error = %e, "Failed to deliver reply");
    }
}
