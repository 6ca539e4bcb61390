//! Application services - Business logic orchestration

pub mod event_logger;
pub mod query_service;

pub use event_logger::EventLogger;
pub use query_service::QueryService;
