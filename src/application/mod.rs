//! Application layer - Use cases and business logic
//! 
//! This layer contains:
//! - Services: Query orchestration and command event logging
//! - Errors: Domain-specific errors
//! - Messaging: Message parsing and command dispatching
//! - Runtime: The dispatch loop tying adapters to handlers

pub mod errors;
pub mod services;
pub mod messaging;
pub mod runtime;
