use async_trait::async_trait;
use crate::application::errors::BotError;
use crate::domain::entities::InboundMessage;

/// Bot trait - abstraction for messaging platform adapters
#[async_trait]
pub trait Bot: Send + Sync {
    /// Send a reply to the conversation a request came from
    async fn reply(&self, target: &ReplyTarget, text: &str) -> Result<(), BotError>;

    /// Get bot info
    fn bot_info(&self) -> BotInfo;
}

/// Where a reply should be delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyTarget {
    pub channel: String,
    pub thread_ts: Option<String>,
}

impl ReplyTarget {
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            thread_ts: None,
        }
    }
}

impl From<&InboundMessage> for ReplyTarget {
    fn from(message: &InboundMessage) -> Self {
        Self {
            channel: message.channel.clone(),
            thread_ts: message.thread_ts.clone(),
        }
    }
}

/// Bot information
#[derive(Debug, Clone)]
pub struct BotInfo {
    pub id: String,
    pub name: String,
}
