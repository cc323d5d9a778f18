//! Recording test message.

use async_trait::async_trait;
use slirc_dispatch::{
    CallArgs, CommandHandler, ContentKind, EventType, HandlerResult, Message, ReplyError,
    handler_fn,
};
use std::sync::{Arc, Mutex};

/// Identity of the bot in every test message.
pub const BOT_ID: &str = "@bot:test";

/// A message that records every reply it is asked to send.
pub struct TestMessage {
    pub sender: String,
    pub body: String,
    pub kind: ContentKind,
    pub event_type: EventType,
    pub replies: Mutex<Vec<String>>,
}

impl TestMessage {
    /// Text message from `@user:test`.
    pub fn new(body: &str) -> Arc<Self> {
        Self::build("@user:test", body, ContentKind::Text)
    }

    /// Message sent by the bot itself.
    pub fn from_bot(body: &str) -> Arc<Self> {
        Self::build(BOT_ID, body, ContentKind::Text)
    }

    pub fn with_kind(body: &str, kind: ContentKind) -> Arc<Self> {
        Self::build("@user:test", body, kind)
    }

    pub fn with_event_type(body: &str, event_type: EventType) -> Arc<Self> {
        Arc::new(Self {
            event_type,
            ..Self::plain("@user:test", body, ContentKind::Text)
        })
    }

    fn plain(sender: &str, body: &str, kind: ContentKind) -> Self {
        Self {
            sender: sender.to_string(),
            body: body.to_string(),
            kind,
            event_type: EventType::RoomMessage,
            replies: Mutex::new(Vec::new()),
        }
    }

    fn build(sender: &str, body: &str, kind: ContentKind) -> Arc<Self> {
        Arc::new(Self::plain(sender, body, kind))
    }

    pub fn replies(&self) -> Vec<String> {
        self.replies.lock().unwrap().clone()
    }

    pub fn as_dyn(msg: &Arc<Self>) -> Arc<dyn Message> {
        Arc::clone(msg) as Arc<dyn Message>
    }
}

#[async_trait]
impl Message for TestMessage {
    fn sender(&self) -> &str {
        &self.sender
    }

    fn body(&self) -> &str {
        &self.body
    }

    fn kind(&self) -> ContentKind {
        self.kind
    }

    fn event_type(&self) -> EventType {
        self.event_type
    }

    fn bot_id(&self) -> &str {
        BOT_ID
    }

    async fn reply(&self, text: &str) -> Result<(), ReplyError> {
        self.replies.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// Records the arguments of every handler invocation, tagged by name.
#[derive(Clone, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<(String, CallArgs)>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handler that records `(tag, args)` and succeeds.
    pub fn handler(&self, tag: &str) -> impl CommandHandler + 'static {
        let calls = Arc::clone(&self.calls);
        let tag = tag.to_string();
        handler_fn(move |_msg, args| {
            let calls = Arc::clone(&calls);
            let tag = tag.clone();
            async move {
                calls.lock().unwrap().push((tag, args));
                HandlerResult::Ok(())
            }
        })
    }

    pub fn calls(&self) -> Vec<(String, CallArgs)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn tags(&self) -> Vec<String> {
        self.calls().into_iter().map(|(tag, _)| tag).collect()
    }
}
