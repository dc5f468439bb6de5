// ABOUTME: Console platform: stdin lines become direct messages, replies go to stdout
// ABOUTME: Runs the full bridge pipeline locally without any chat service credentials

use agentcord_core::traits::{ChatGateway, EventStream, IncomingMessage};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Mutex;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_stream::wrappers::LinesStream;
use tokio_stream::StreamExt;

/// User id every console line is attributed to
pub const CONSOLE_USER_ID: &str = "console";

const CONSOLE_CHANNEL_ID: &str = "console";

type Input = Box<dyn AsyncBufRead + Send + Unpin>;
type Output = Box<dyn AsyncWrite + Send + Unpin>;

/// Local platform over a line-oriented reader and writer
pub struct ConsolePlatform {
    input: Mutex<Option<Input>>,
    output: tokio::sync::Mutex<Output>,
}

impl ConsolePlatform {
    /// Console on the process's stdin and stdout
    pub fn stdio() -> Self {
        Self::with_io(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }

    pub fn with_io(
        input: impl AsyncBufRead + Send + Unpin + 'static,
        output: impl AsyncWrite + Send + Unpin + 'static,
    ) -> Self {
        Self {
            input: Mutex::new(Some(Box::new(input))),
            output: tokio::sync::Mutex::new(Box::new(output)),
        }
    }

    async fn write_line(&self, line: &str) -> Result<()> {
        let mut output = self.output.lock().await;
        output.write_all(line.as_bytes()).await?;
        output.write_all(b"\n").await?;
        output.flush().await.context("Failed to write console output")
    }
}

#[async_trait]
impl ChatGateway for ConsolePlatform {
    async fn event_stream(&self) -> Result<EventStream> {
        let input = self
            .input
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .context("Console input already taken")?;

        let stream = LinesStream::new(input.lines())
            .map_while(|line| match line {
                Ok(line) => Some(line),
                Err(e) => {
                    tracing::warn!(error = %e, "Console input closed");
                    None
                }
            })
            .map(|line| {
                IncomingMessage::direct("console", CONSOLE_CHANNEL_ID, CONSOLE_USER_ID, line)
            });
        Ok(Box::pin(stream))
    }

    async fn reply(&self, _to: &IncomingMessage, text: &str) -> Result<()> {
        self.write_line(text).await
    }

    async fn send(&self, channel_id: &str, text: &str) -> Result<()> {
        self.write_line(&format!("[{}] {}", channel_id, text)).await
    }

    fn bot_user_id(&self) -> String {
        "agentcord".to_string()
    }

    fn platform_id(&self) -> &'static str {
        "console"
    }

    fn display_name(&self) -> &'static str {
        "Console"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_lines_become_direct_messages() {
        let platform = ConsolePlatform::with_io(&b"hello\n\nsecond line\n"[..], tokio::io::sink());
        let messages: Vec<IncomingMessage> = platform.event_stream().await.unwrap().collect().await;

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].body, "hello");
        assert_eq!(messages[1].body, "");
        assert_eq!(messages[2].body, "second line");
        for msg in &messages {
            assert!(msg.is_direct);
            assert_eq!(msg.sender.id, CONSOLE_USER_ID);
            assert_eq!(msg.platform_id, "console");
        }
        assert_ne!(messages[0].message_id, messages[2].message_id);
    }

    #[tokio::test]
    async fn test_event_stream_taken_once() {
        let platform = ConsolePlatform::with_io(&b""[..], tokio::io::sink());
        assert!(platform.event_stream().await.is_ok());
        assert!(platform.event_stream().await.is_err());
    }

    #[tokio::test]
    async fn test_reply_and_send_write_lines() {
        let (writer, mut reader) = tokio::io::duplex(1024);
        let platform = ConsolePlatform::with_io(&b""[..], writer);
        let msg = IncomingMessage::direct("console", "console", "console", "hi");

        platform.reply(&msg, "first").await.unwrap();
        platform.send("42", "online").await.unwrap();
        drop(platform);

        let mut written = String::new();
        reader.read_to_string(&mut written).await.unwrap();
        assert_eq!(written, "first\n[42] online\n");
    }
}
