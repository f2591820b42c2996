//! Pipeline progress events.

use std::path::PathBuf;

use tokio::sync::mpsc;

use crate::stages::Stage;

/// Events emitted while a run progresses.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// Coarse status line, e.g. "Generating compilation 12/33".
    Primary(String),
    /// Fine-grained status line, e.g. an ETA or encode percentage.
    Secondary(String),
    /// A retryable stage failed; the run can resume from it.
    RetryAvailable { stage: Stage },
    /// The run finished and produced a delivery file.
    Completed { output: PathBuf },
    /// The run was cancelled.
    Cancelled,
}

/// Sender half of the event channel.
pub type EventSender = mpsc::UnboundedSender<PipelineEvent>;

/// Event sink handed to the stages.
///
/// Emission never blocks and never fails: a closed or absent channel just
/// drops events, so stages do not couple to whether anyone is listening.
#[derive(Clone, Default)]
pub struct Events {
    tx: Option<EventSender>,
}

impl Events {
    /// Sink that forwards events to `tx`.
    pub fn new(tx: EventSender) -> Self {
        Self { tx: Some(tx) }
    }

    /// Sink that discards everything.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: PipelineEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }

    pub fn primary(&self, message: impl Into<String>) {
        self.emit(PipelineEvent::Primary(message.into()));
    }

    pub fn secondary(&self, message: impl Into<String>) {
        self.emit(PipelineEvent::Secondary(message.into()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_sink_discards() {
        let events = Events::disabled();
        events.primary("nobody is listening");
    }

    #[tokio::test]
    async fn test_events_are_delivered_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let events = Events::new(tx);

        events.primary("first");
        events.secondary("second");

        assert_eq!(rx.recv().await, Some(PipelineEvent::Primary("first".into())));
        assert_eq!(
            rx.recv().await,
            Some(PipelineEvent::Secondary("second".into()))
        );
    }
}
