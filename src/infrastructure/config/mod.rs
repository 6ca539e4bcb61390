//! Configuration management
//!
//! Secrets come from the environment (optionally via `.env`). Everything else
//! has a default and can be tuned with a YAML settings file.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::application::errors::ConfigError;
use crate::domain::entities::{CommandPattern, UnitSystem};

pub const SLACK_BOT_TOKEN: &str = "SLACK_BOT_TOKEN";
pub const SLACK_APP_TOKEN: &str = "SLACK_APP_TOKEN";
pub const WIT_AI_TOKEN: &str = "WIT_AI_TOKEN";
pub const WOLFRAM_APP_ID: &str = "WOLFRAM_APP_ID";

/// Bot settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub bot: BotConfig,
    pub wit: WitConfig,
    pub wolfram: WolframConfig,
    pub http: HttpConfig,
    pub runtime: RuntimeConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BotConfig {
    pub name: String,
    pub command: String,
    pub description: String,
    pub example: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct WitConfig {
    pub api_base: String,
    pub api_version: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct WolframConfig {
    pub api_base: String,
    pub units: UnitSystem,
    pub timeout: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct HttpConfig {
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RuntimeConfig {
    pub shutdown_grace_secs: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: "wolfram-slack-bot".to_string(),
            command: "query - <message>".to_string(),
            description: "Send any question to Wolfram Alpha".to_string(),
            example: "who was the president of Nepal in 2017?".to_string(),
        }
    }
}

impl Default for WitConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.wit.ai".to_string(),
            api_version: "20240304".to_string(),
        }
    }
}

impl Default for WolframConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.wolframalpha.com".to_string(),
            units: UnitSystem::Metric,
            timeout: 1000,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            shutdown_grace_secs: 10,
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load the settings file if it exists, otherwise use defaults
    pub fn load_or_default(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply `WIT_API_BASE` / `WOLFRAM_API_BASE` overrides
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(base) = lookup("WIT_API_BASE").filter(|v| !v.trim().is_empty()) {
            self.wit.api_base = base;
        }
        if let Some(base) = lookup("WOLFRAM_API_BASE").filter(|v| !v.trim().is_empty()) {
            self.wolfram.api_base = base;
        }
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if CommandPattern::parse(&self.bot.command).params().is_empty() {
            return Err(ConfigError::InvalidValue(format!(
                "bot.command must capture the question as a <parameter>: {}",
                self.bot.command
            )));
        }
        if self.http.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "http.request-timeout-secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http.request_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.runtime.shutdown_grace_secs)
    }
}

/// Slack Socket Mode tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlackTokens {
    /// `xoxb-` token used for Web API calls
    pub bot_token: String,
    /// `xapp-` token used to open Socket Mode connections
    pub app_token: String,
}

/// API credentials, all required unless running without Slack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub wit_ai_token: String,
    pub wolfram_app_id: String,
    pub slack: Option<SlackTokens>,
}

impl Credentials {
    pub fn from_env(require_slack: bool) -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok(), require_slack)
    }

    /// Read credentials through `lookup`; blank values count as missing
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        require_slack: bool,
    ) -> Result<Self, ConfigError> {
        let required = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::MissingVar(name.to_string()))
        };

        let slack = if require_slack {
            Some(SlackTokens {
                bot_token: required(SLACK_BOT_TOKEN)?,
                app_token: required(SLACK_APP_TOKEN)?,
            })
        } else {
            None
        };

        Ok(Self {
            wit_ai_token: required(WIT_AI_TOKEN)?,
            wolfram_app_id: required(WOLFRAM_APP_ID)?,
            slack,
        })
    }
}
