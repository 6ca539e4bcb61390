use async_trait::async_trait;

use crate::application::errors::AdapterError;
use crate::domain::entities::UnitSystem;

/// Computational knowledge backend returning spoken-form answers
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Resolve a query into a natural-language answer
    async fn spoken_answer(
        &self,
        query: &str,
        units: UnitSystem,
        timeout: u32,
    ) -> Result<String, AdapterError>;
}
