//! Console adapter for development/testing

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::application::errors::BotError;
use crate::domain::entities::InboundMessage;
use crate::domain::traits::{Bot, BotInfo, ReplyTarget};

const CHANNEL: &str = "console";

/// Console bot adapter for local development
pub struct ConsoleAdapter {
    info: BotInfo,
}

impl ConsoleAdapter {
    pub fn new() -> Self {
        Self {
            info: BotInfo {
                id: "console".to_string(),
                name: "wolfram-slack-bot".to_string(),
            },
        }
    }

    /// Forward stdin lines until EOF or cancellation
    pub async fn listen(
        &self,
        inbound: mpsc::Sender<InboundMessage>,
        cancel: CancellationToken,
    ) -> Result<(), BotError> {
        tracing::info!("Starting console bot (dev mode), type `help` for commands");
        self.listen_on(BufReader::new(tokio::io::stdin()), inbound, cancel).await
    }

    pub async fn listen_on<R: AsyncBufRead + Unpin>(
        &self,
        reader: R,
        inbound: mpsc::Sender<InboundMessage>,
        cancel: CancellationToken,
    ) -> Result<(), BotError> {
        let mut lines = reader.lines();

        loop {
            let line = tokio::select! {
                _ = cancel.cancelled() => break,
                line = lines.next_line() => line.map_err(|e| BotError::Internal(e.to_string()))?,
            };

            let Some(line) = line else {
                tracing::info!("Console input closed");
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            let message = InboundMessage::new(CHANNEL, line)
                .with_user(CHANNEL)
                .with_platform(CHANNEL);
            if inbound.send(message).await.is_err() {
                break;
            }
        }

        Ok(())
    }
}

impl Default for ConsoleAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Bot for ConsoleAdapter {
    async fn reply(&self, _target: &ReplyTarget, text: &str) -> Result<(), BotError> {
        println!("[BOT] {}", text);
        Ok(())
    }

    fn bot_info(&self) -> BotInfo {
        self.info.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_forwards_non_empty_lines() {
        let input: &[u8] = b"query - what is pi\n\n   \nhelp\n";
        let (tx, mut rx) = mpsc::channel(8);

        ConsoleAdapter::new()
            .listen_on(input, tx, CancellationToken::new())
            .await
            .unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first.text, "query - what is pi");
        assert_eq!(first.platform, "console");
        assert_eq!(rx.recv().await.unwrap().text, "help");
        assert!(rx.recv().await.is_none());
    }
}
