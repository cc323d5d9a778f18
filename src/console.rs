//! Console integration: stdin lines in, replies on stdout.
//!
//! Each input line becomes one text message from the configured sender.

use crate::error::ReplyError;
use crate::message::{ContentKind, Message};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, mpsc};
use tracing::debug;

/// Shared reply sink.
pub type ConsoleOutput = Arc<Mutex<Box<dyn AsyncWrite + Send + Unpin>>>;

/// A message read from the console.
pub struct ConsoleMessage {
    sender: String,
    bot_id: String,
    body: String,
    out: ConsoleOutput,
}

impl ConsoleMessage {
    pub fn new(
        sender: impl Into<String>,
        bot_id: impl Into<String>,
        body: impl Into<String>,
        out: ConsoleOutput,
    ) -> Self {
        Self {
            sender: sender.into(),
            bot_id: bot_id.into(),
            body: body.into(),
            out,
        }
    }
}

#[async_trait]
impl Message for ConsoleMessage {
    fn sender(&self) -> &str {
        &self.sender
    }

    fn body(&self) -> &str {
        &self.body
    }

    fn kind(&self) -> ContentKind {
        ContentKind::Text
    }

    fn bot_id(&self) -> &str {
        &self.bot_id
    }

    async fn reply(&self, text: &str) -> Result<(), ReplyError> {
        let mut out = self.out.lock().await;
        let mut buf = String::with_capacity(text.len() + 1);
        buf.push_str(text);
        buf.push('\n');
        out.write_all(buf.as_bytes())
            .await
            .map_err(|e| ReplyError(e.to_string()))?;
        out.flush().await.map_err(|e| ReplyError(e.to_string()))
    }
}

/// Read lines from `reader` and forward them as messages until EOF or the
/// receiving side goes away. Blank lines are skipped.
pub async fn pump_lines<R>(
    reader: R,
    sender: &str,
    bot_id: &str,
    out: ConsoleOutput,
    tx: mpsc::Sender<Arc<dyn Message>>,
) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut count = 0;
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let msg: Arc<dyn Message> =
            Arc::new(ConsoleMessage::new(sender, bot_id, line, Arc::clone(&out)));
        if tx.send(msg).await.is_err() {
            debug!("Router closed, stopping console input");
            break;
        }
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    fn sink() -> ConsoleOutput {
        let writer: Box<dyn AsyncWrite + Send + Unpin> = Box::new(tokio::io::sink());
        Arc::new(Mutex::new(writer))
    }

    #[tokio::test]
    async fn test_pump_skips_blank_lines() {
        let (tx, mut rx) = mpsc::channel(8);
        let input = BufReader::new(&b"!ping\n\n   \nhello\n"[..]);
        let count = pump_lines(input, "@me:test", "@bot:test", sink(), tx)
            .await
            .unwrap();
        assert_eq!(count, 2);

        let first = rx.recv().await.unwrap();
        assert_eq!(first.body(), "!ping");
        assert_eq!(first.sender(), "@me:test");
        assert_eq!(first.bot_id(), "@bot:test");
        assert_eq!(rx.recv().await.unwrap().body(), "hello");
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_reply_to_sink() {
        let msg = ConsoleMessage::new("a", "b", "body", sink());
        assert!(msg.reply("pong").await.is_ok());
    }
}
