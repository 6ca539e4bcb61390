use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw user utterance, exactly as captured from the command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundQuery {
    pub text: String,
}

impl InboundQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Entity value pulled out of an NLU result.
///
/// `present` is false when the entity slot was missing from the result; the
/// value is then empty and must not be sent on to the knowledge backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedEntity {
    pub value: String,
    pub present: bool,
}

impl ExtractedEntity {
    pub fn found(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            present: true,
        }
    }

    pub fn missing() -> Self {
        Self {
            value: String::new(),
            present: false,
        }
    }

    pub fn into_value(self) -> Option<String> {
        self.present.then_some(self.value)
    }
}

/// Reply text sent back to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
}

impl Answer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// Unit system requested from the knowledge backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

impl UnitSystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitSystem::Metric => "metric",
            UnitSystem::Imperial => "imperial",
        }
    }
}
