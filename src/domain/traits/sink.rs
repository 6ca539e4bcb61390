use crate::domain::entities::CommandEvent;

/// Diagnostic output for command events. Writes are infallible.
pub trait EventSink: Send + Sync {
    fn write(&self, event: &CommandEvent);
}
