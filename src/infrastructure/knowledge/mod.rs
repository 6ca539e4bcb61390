//! Knowledge backends

pub mod wolfram;

pub use wolfram::WolframClient;
