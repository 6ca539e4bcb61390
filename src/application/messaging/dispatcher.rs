//! Command dispatcher - Routes messages to command handlers

use tokio::sync::mpsc;

use super::parser::MessageParser;
use crate::domain::entities::{
    Answer, CommandDefinition, CommandEvent, CommandPattern, CommandRegistry, InboundMessage,
};
use crate::domain::traits::CommandRequest;

/// Matches inbound messages against registered commands and runs the handler
pub struct CommandDispatcher {
    parser: MessageParser,
    registry: CommandRegistry,
    help: CommandPattern,
    events: Option<mpsc::UnboundedSender<CommandEvent>>,
}

impl CommandDispatcher {
    pub fn new() -> Self {
        Self {
            parser: MessageParser::new(),
            registry: CommandRegistry::new(),
            help: CommandPattern::parse("help"),
            events: None,
        }
    }

    /// Publish a `CommandEvent` for every matched command
    pub fn with_events(mut self, events: mpsc::UnboundedSender<CommandEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Register a command handler
    pub fn register_command(&mut self, command: CommandDefinition) {
        tracing::debug!("Registered command: {}", command.pattern.as_str());
        self.registry.register(command);
    }

    pub fn commands(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Help text listing every registered command
    pub fn help_text(&self) -> String {
        let mut help = "Available commands:\n`help` - Show this message".to_string();
        for cmd in self.registry.all() {
            help.push('\n');
            help.push_str(&cmd.usage());
        }
        help
    }

    /// Handle one message. Returns `None` when no command matched.
    pub async fn dispatch(&self, message: InboundMessage) -> Option<Answer> {
        let input = self.parser.parse(&message.text);

        if let Some(matched) = self.help.matches(input) {
            self.publish(&self.help, &matched.parameters, &message);
            return Some(Answer::new(self.help_text()));
        }

        let Some((command, matched)) = self.registry.find(input) else {
            tracing::debug!("[{}] No command matched", message.channel);
            return None;
        };

        self.publish(&command.pattern, &matched.parameters, &message);
        tracing::info!(
            "[{}] Running command: {} (message {})",
            message.channel,
            command.pattern.as_str(),
            message.id
        );

        let handler = command.handler.clone();
        Some(handler.handle(CommandRequest { message, matched }).await)
    }

    fn publish(
        &self,
        pattern: &CommandPattern,
        parameters: &std::collections::HashMap<String, String>,
        message: &InboundMessage,
    ) {
        let Some(events) = &self.events else {
            return;
        };
        let event = CommandEvent::new(pattern.as_str(), parameters.clone(), message.payload());
        if events.send(event).is_err() {
            tracing::debug!("Event logger is gone, dropping command event");
        }
    }
}

impl Default for CommandDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
