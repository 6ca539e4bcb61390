//! Wit.ai client - Entity extraction

use async_trait::async_trait;
use reqwest::Client;

use crate::application::errors::AdapterError;
use crate::domain::traits::{Nlu, NluResult};

/// Wit.ai API endpoint
const API_BASE: &str = "https://api.wit.ai";

/// API version pinned through the `v` query parameter
const API_VERSION: &str = "20240304";

/// Wit.ai message API client
pub struct WitClient {
    token: String,
    client: Client,
    base: String,
    version: String,
}

impl WitClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            client: Client::new(),
            base: API_BASE.to_string(),
            version: API_VERSION.to_string(),
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

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Get URL of the message endpoint
    fn message_url(&self) -> String {
        format!("{}/message", self.base.trim_end_matches('/'))
    }
}

#[async_trait]
impl Nlu for WitClient {
    fn name(&self) -> &str {
        "wit.ai"
    }

    async fn parse(&self, text: &str) -> Result<NluResult, AdapterError> {
        let response = self
            .client
            .get(self.message_url())
            .query(&[("v", self.version.as_str()), ("q", text)])
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| AdapterError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AdapterError::Status { status, body });
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AdapterError::Parse(e.to_string()))?;

        if !body.is_object() {
            return Err(AdapterError::Parse(format!(
                "expected a JSON object, got: {}",
                body
            )));
        }

        Ok(NluResult::new(body))
    }
}
