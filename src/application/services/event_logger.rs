//! Background consumer for command events

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::domain::entities::CommandEvent;
use crate::domain::traits::EventSink;

/// Writes every command event to a diagnostic sink
pub struct EventLogger {
    sink: Arc<dyn EventSink>,
}

impl EventLogger {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    pub fn log(&self, event: &CommandEvent) {
        self.sink.write(event);
    }

    /// Run on its own task until the feed closes or `cancel` fires
    pub fn spawn(
        self,
        events: mpsc::UnboundedReceiver<CommandEvent>,
        cancel: CancellationToken,
    ) -> JoinHandle<usize> {
        tokio::spawn(self.run(events, cancel))
    }

    /// Consume events in order, returning how many were written.
    ///
    /// Events already queued when `cancel` fires are still written.
    pub async fn run(
        self,
        mut events: mpsc::UnboundedReceiver<CommandEvent>,
        cancel: CancellationToken,
    ) -> usize {
        let mut written = 0;

        loop {
            tokio::select! {
                biased;
                event = events.recv() => match event {
                    Some(event) => {
                        self.log(&event);
                        written += 1;
                    }
                    None => break,
                },
                _ = cancel.cancelled() => {
                    events.close();
                    while let Some(event) = events.recv().await {
                        self.log(&event);
                        written += 1;
                    }
                    break;
                }
            }
        }

        tracing::debug!("Event logger stopped after {} events", written);
        written
    }
}
