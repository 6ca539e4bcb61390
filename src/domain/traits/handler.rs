use async_trait::async_trait;

use crate::domain::entities::{Answer, CommandMatch, InboundMessage};

/// Everything a command handler gets for one invocation
#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub message: InboundMessage,
    pub matched: CommandMatch,
}

impl CommandRequest {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.matched.param(name)
    }
}

/// Handler bound to a command pattern.
///
/// Handlers always produce an answer; failures are turned into reply text
/// before returning so one bad request never reaches the dispatch loop.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, request: CommandRequest) -> Answer;
}
