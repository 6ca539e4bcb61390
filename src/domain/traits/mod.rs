//! Domain traits - Abstractions for infrastructure implementations

pub mod bot;
pub mod handler;
pub mod knowledge;
pub mod nlu;
pub mod sink;

pub use bot::{Bot, BotInfo, ReplyTarget};
pub use handler::{CommandHandler, CommandRequest};
pub use knowledge::KnowledgeBase;
pub use nlu::{Nlu, NluResult, WOLFRAM_QUERY_ENTITY};
pub use sink::EventSink;
