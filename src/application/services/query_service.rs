//! Query orchestration - utterance → NLU entity → spoken answer

use async_trait::async_trait;
use std::sync::Arc;

use crate::application::errors::QueryError;
use crate::domain::entities::{Answer, InboundQuery, UnitSystem};
use crate::domain::traits::{CommandHandler, CommandRequest, KnowledgeBase, Nlu, WOLFRAM_QUERY_ENTITY};

/// Timeout passed to the knowledge backend with every query
pub const DEFAULT_KNOWLEDGE_TIMEOUT: u32 = 1000;

/// Command parameter carrying the user's question
pub const DEFAULT_QUERY_PARAM: &str = "message";

/// Drives one question through the NLU and knowledge services
pub struct QueryService {
    nlu: Arc<dyn Nlu>,
    knowledge: Arc<dyn KnowledgeBase>,
    units: UnitSystem,
    timeout: u32,
    param: String,
}

impl QueryService {
    pub fn new(nlu: Arc<dyn Nlu>, knowledge: Arc<dyn KnowledgeBase>) -> Self {
        Self {
            nlu,
            knowledge,
            units: UnitSystem::Metric,
            timeout: DEFAULT_KNOWLEDGE_TIMEOUT,
            param: DEFAULT_QUERY_PARAM.to_string(),
        }
    }

    pub fn with_units(mut self, units: UnitSystem) -> Self {
        self.units = units;
        self
    }

    pub fn with_timeout(mut self, timeout: u32) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.param = param.into();
        self
    }

    /// Resolve a query, stopping at the first failed step
    pub async fn resolve(&self, query: &InboundQuery) -> Result<String, QueryError> {
        tracing::debug!("Query: {}", query.text);

        let parsed = self
            .nlu
            .parse(&query.text)
            .await
            .map_err(QueryError::Nlu)?;

        let value = parsed
            .entity(WOLFRAM_QUERY_ENTITY)
            .into_value()
            .ok_or(QueryError::NotUnderstood)?;
        tracing::debug!(
            "Extracted entity: {} (intent: {})",
            value,
            parsed.top_intent().unwrap_or("none")
        );

        self.knowledge
            .spoken_answer(&value, self.units, self.timeout)
            .await
            .map_err(QueryError::Knowledge)
    }

    /// Answer a query. Failures become user-facing text instead of errors.
    pub async fn answer(&self, query: InboundQuery) -> Answer {
        match self.resolve(&query).await {
            Ok(text) => Answer::new(text),
            Err(e) => {
                match &e {
                    QueryError::NotUnderstood => {
                        tracing::info!("Could not extract a query from: {}", query.text)
                    }
                    QueryError::Nlu(_) => tracing::warn!("{} request failed: {}", self.nlu.name(), e),
                    QueryError::Knowledge(_) => {
                        tracing::warn!("{} request failed: {}", self.knowledge.name(), e)
                    }
                }
                Answer::new(e.reply_text())
            }
        }
    }
}

#[async_trait]
impl CommandHandler for QueryService {
    async fn handle(&self, request: CommandRequest) -> Answer {
        match request.param(&self.param) {
            Some(text) => self.answer(InboundQuery::new(text)).await,
            None => Answer::new(QueryError::NotUnderstood.reply_text()),
        }
    }
}
