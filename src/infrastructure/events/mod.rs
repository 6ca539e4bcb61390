//! Command event sinks

use std::io::Write;

use crate::domain::entities::CommandEvent;
use crate::domain::traits::EventSink;

/// Writes command events as structured `tracing` records
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn write(&self, event: &CommandEvent) {
        tracing::info!(
            target: "command_events",
            timestamp = %event.timestamp.to_rfc3339(),
            command = %event.command,
            parameters = ?event.parameters,
            event = %event.event,
            "Command event"
        );
    }
}

/// Prints command events to stdout as a plain-text block
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl StdoutSink {
    pub fn format(event: &CommandEvent) -> String {
        let mut params: Vec<_> = event.parameters.iter().collect();
        params.sort();
        let params = params
            .iter()
            .map(|(k, v)| format!("{}:{}", k, v))
            .collect::<Vec<_>>()
            .join(" ");

        format!(
            "Command Events\n{}\n{}\nmap[{}]\n{}\n",
            event.timestamp.to_rfc3339(),
            event.command,
            params,
            event.event
        )
    }
}

impl EventSink for StdoutSink {
    fn write(&self, event: &CommandEvent) {
        let mut out = std::io::stdout().lock();
        // A closed stdout must not affect request handling
        let _ = writeln!(out, "{}", Self::format(event));
    }
}
