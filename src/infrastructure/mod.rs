//! Infrastructure layer - External concerns
//! 
//! This layer contains:
//! - Config: Environment and settings file loading
//! - NLU / Knowledge: HTTP clients for Wit.ai and Wolfram|Alpha
//! - Events: Command event sinks
//! - Adapters: Platform integrations (Slack, console)

pub mod config;
pub mod nlu;
pub mod knowledge;
pub mod events;
pub mod adapters;
