//! Wolfram|Alpha Spoken Results API client

use async_trait::async_trait;
use reqwest::Client;

use crate::application::errors::AdapterError;
use crate::domain::entities::UnitSystem;
use crate::domain::traits::KnowledgeBase;

/// Wolfram|Alpha API endpoint
const API_BASE: &str = "https://api.wolframalpha.com";

/// Wolfram|Alpha client, authenticated by an AppID
pub struct WolframClient {
    app_id: String,
    client: Client,
    base: String,
}

impl WolframClient {
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            client: Client::new(),
            base: API_BASE.to_string(),
        }
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    /// Get URL of the spoken results endpoint
    fn spoken_url(&self) -> String {
        format!("{}/v1/spoken", self.base.trim_end_matches('/'))
    }
}

#[async_trait]
impl KnowledgeBase for WolframClient {
    fn name(&self) -> &str {
        "wolfram-alpha"
    }

    async fn spoken_answer(
        &self,
        query: &str,
        units: UnitSystem,
        timeout: u32,
    ) -> Result<String, AdapterError> {
        let timeout = timeout.to_string();
        let response = self
            .client
            .get(self.spoken_url())
            .query(&[
                ("appid", self.app_id.as_str()),
                ("i", query),
                ("units", units.as_str()),
                ("timeout", timeout.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AdapterError::Network(e.to_string()))?;

        // 501 means the input was not understood or has no short answer
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AdapterError::Status { status, body });
        }

        let answer = response
            .text()
            .await
            .map_err(|e| AdapterError::Parse(e.to_string()))?;

        let answer = answer.trim_end_matches(['\r', '\n']);
        if answer.trim().is_empty() {
            return Err(AdapterError::Parse("empty answer".to_string()));
        }

        Ok(answer.to_string())
    }
}
