//! Pipeline events and the observers that receive them.
//!
//! Every component reports what it does through a [`PipelineObserver`]
//! handed to it at construction time, so tests can assert on the event
//! stream while the binary forwards it to `tracing`.

use crate::Item;
use parking_lot::Mutex;
use std::sync::Arc;

/// Something that happened inside the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    /// A stage worker entered its wait loop
    StageStarted { stage: Arc<str> },
    /// A stage read an item from its input queue
    ItemReceived { stage: Arc<str>, value: Item },
    /// A stage sent an item to its output queue
    ItemForwarded { stage: Arc<str>, value: Item },
    /// A filter predicate rejected an item
    ItemRejected { stage: Arc<str>, value: Item },
    /// An item was stored in a stage's ring buffer
    ItemBuffered { stage: Arc<str>, value: Item },
    /// A full ring buffer discarded its oldest item
    ItemEvicted { stage: Arc<str>, value: Item },
    /// A batching stage's timer fired
    TimerFired { stage: Arc<str> },
    /// A ring buffer was drained
    BufferFlushed { stage: Arc<str>, count: usize },
    /// A flush found nothing to drain
    EmptyFlush { stage: Arc<str> },
    /// The upstream side of a stage's input queue went away
    InputClosed { stage: Arc<str> },
    /// The downstream side of a stage's output queue went away
    OutputClosed { stage: Arc<str> },
    /// A stage observed the shutdown signal
    ShutdownObserved { stage: Arc<str> },
    /// A stage worker exited and closed its output
    StageStopped { stage: Arc<str> },
    /// The producer parsed a line into an item
    InputParsed { value: Item },
    /// The producer could not parse a line
    InvalidInput { line: String },
    /// The producer reached the end of its input stream
    InputExhausted,
    /// The consumer wrote an item to its output stream
    ItemDelivered { value: Item },
    /// An interrupt requested shutdown
    ShutdownRequested,
}

/// Receives pipeline events
pub trait PipelineObserver: Send + Sync {
    fn on_event(&self, event: &PipelineEvent);
}

/// Forwards every event to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_event(&self, event: &PipelineEvent) {
        use PipelineEvent::*;
        match event {
            StageStarted { stage } => tracing::info!(%stage, "stage started"),
            ItemReceived { stage, value } => tracing::debug!(%stage, value, "received value"),
            ItemForwarded { stage, value } => tracing::debug!(%stage, value, "forwarded value"),
            ItemRejected { stage, value } => {
                tracing::debug!(%stage, value, "value did not pass the filter")
            }
            ItemBuffered { stage, value } => tracing::debug!(%stage, value, "value buffered"),
            ItemEvicted { stage, value } => {
                tracing::info!(%stage, value, "buffer full, oldest value overwritten")
            }
            TimerFired { stage } => tracing::debug!(%stage, "flush timer fired"),
            BufferFlushed { stage, count } => tracing::info!(%stage, count, "buffer flushed"),
            EmptyFlush { stage } => tracing::debug!(%stage, "buffer empty, nothing to flush"),
            InputClosed { stage } => tracing::info!(%stage, "input queue closed"),
            OutputClosed { stage } => tracing::info!(%stage, "output queue closed by receiver"),
            ShutdownObserved { stage } => tracing::info!(%stage, "shutdown signal received"),
            StageStopped { stage } => tracing::info!(%stage, "stage stopped"),
            InputParsed { value } => tracing::debug!(value, "read number"),
            InvalidInput { line } => tracing::warn!(line = %line, "invalid input"),
            InputExhausted => tracing::info!("input finished"),
            ItemDelivered { value } => tracing::debug!(value, "delivered value"),
            ShutdownRequested => tracing::info!("shutdown requested by user"),
        }
    }
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {
    fn on_event(&self, _event: &PipelineEvent) {}
}

/// Collects events in memory
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<PipelineEvent>>,
}

impl RecordingObserver {
    /// Create an observer with no recorded events
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a copy of every event recorded so far
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.lock().clone()
    }

    /// Count recorded events matching a predicate
    pub fn count(&self, predicate: impl Fn(&PipelineEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| predicate(e)).count()
    }
}

impl PipelineObserver for RecordingObserver {
    fn on_event(&self, event: &PipelineEvent) {
        self.events.lock().push(event.clone());
    }
}

impl<O: PipelineObserver + ?Sized> PipelineObserver for Arc<O> {
    fn on_event(&self, event: &PipelineEvent) {
        (**self).on_event(event)
    }
}
