//! Slack bot answering questions with Wit.ai entity extraction and
//! Wolfram|Alpha spoken results.

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod app;
