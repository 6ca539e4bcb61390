//! Domain entities - Core business objects with no external dependencies

pub mod query;
pub mod message;
pub mod command;
pub mod event;

pub use query::{Answer, ExtractedEntity, InboundQuery, UnitSystem};
pub use message::InboundMessage;
pub use command::{CommandDefinition, CommandMatch, CommandPattern, CommandRegistry};
pub use event::CommandEvent;
