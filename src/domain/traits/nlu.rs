use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::application::errors::AdapterError;
use crate::domain::entities::ExtractedEntity;

/// Entity slot holding the text to send to the knowledge backend
pub const WOLFRAM_QUERY_ENTITY: &str = "wolfram_search_query:wolfram_search_query";

/// Prefix Wit.ai puts on its built-in entities
pub const BUILTIN_ENTITY_PREFIX: &str = "wit$";

/// Structured NLU response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NluResult(pub serde_json::Value);

impl NluResult {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// Look up `entities.<name>[0].value`, then the `wit$` built-in form of
    /// the same entity. Blank values count as missing.
    pub fn entity(&self, name: &str) -> ExtractedEntity {
        let builtin = format!("{}{}", BUILTIN_ENTITY_PREFIX, name);
        let entity = [name, builtin.as_str()]
            .into_iter()
            .filter_map(|key| first_entity_value(&self.0, key))
            .find_map(entity_text)
            .map(ExtractedEntity::found)
            .unwrap_or_else(ExtractedEntity::missing);
        entity
    }

    /// Intent name with the highest confidence, when the service returned one
    pub fn top_intent(&self) -> Option<&str> {
        self.0.get("intents")?.get(0)?.get("name")?.as_str()
    }
}

fn entity_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if s.trim().is_empty() => None,
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn first_entity_value<'a>(body: &'a serde_json::Value, name: &str) -> Option<&'a serde_json::Value> {
    body.get("entities")?.get(name)?.get(0)?.get("value")
}

/// Natural-language understanding service
#[async_trait]
pub trait Nlu: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Turn free text into a structured result
    async fn parse(&self, text: &str) -> Result<NluResult, AdapterError>;
}
