//! Application layer errors

use thiserror::Error;

/// Platform and runtime errors
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure of a call to an external API (NLU or knowledge backend)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error: status {status}, body: {body}")]
    Status { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Why a single query could not be answered
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("NLU result has no query entity")]
    NotUnderstood,

    #[error("NLU request failed: {0}")]
    Nlu(AdapterError),

    #[error("Knowledge request failed: {0}")]
    Knowledge(AdapterError),
}

impl QueryError {
    /// Text shown to the user in place of an answer
    pub fn reply_text(&self) -> &'static str {
        match self {
            QueryError::NotUnderstood => "I could not understand that question.",
            QueryError::Nlu(_) => {
                "Sorry, I could not reach the language service. Please try again later."
            }
            QueryError::Knowledge(_) => "Sorry, I could not find an answer to that question.",
        }
    }
}

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
