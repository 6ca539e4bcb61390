use chrono::{DateTime, Utc};

/// A message delivered by a chat platform adapter
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub id: String,
    pub channel: String,
    pub thread_ts: Option<String>,
    pub user: Option<String>,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub platform: String,
    pub raw: Option<serde_json::Value>,
}

impl InboundMessage {
    pub fn new(channel: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            channel: channel.into(),
            thread_ts: None,
            user: None,
            text: text.into(),
            timestamp: Utc::now(),
            platform: "unknown".to_string(),
            raw: None,
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_thread(mut self, thread_ts: impl Into<String>) -> Self {
        self.thread_ts = Some(thread_ts.into());
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    pub fn with_raw(mut self, raw: serde_json::Value) -> Self {
        self.raw = Some(raw);
        self
    }

    /// Raw platform payload, or a minimal JSON description when the adapter had none
    pub fn payload(&self) -> serde_json::Value {
        self.raw.clone().unwrap_or_else(|| {
            serde_json::json!({
                "platform": self.platform,
                "channel": self.channel,
                "user": self.user,
                "text": self.text,
            })
        })
    }
}
