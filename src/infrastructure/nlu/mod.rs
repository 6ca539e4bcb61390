//! NLU providers

pub mod wit;

pub use wit::WitClient;
