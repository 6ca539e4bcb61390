//! Domain layer - Core types with no network dependencies
//! 
//! This layer contains:
//! - Entities: Query, answer, command and event types
//! - Traits: Abstractions for the external services (NLU, knowledge, chat platform)

pub mod entities;
pub mod traits;
