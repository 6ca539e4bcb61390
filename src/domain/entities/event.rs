use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Emitted every time an inbound message matches a registered command
#[derive(Debug, Clone, Serialize)]
pub struct CommandEvent {
    pub timestamp: DateTime<Utc>,
    /// Pattern of the matched command
    pub command: String,
    pub parameters: HashMap<String, String>,
    /// Raw platform payload that triggered the command
    pub event: serde_json::Value,
}

impl CommandEvent {
    pub fn new(
        command: impl Into<String>,
        parameters: HashMap<String, String>,
        event: serde_json::Value,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            command: command.into(),
            parameters,
            event,
        }
    }
}
