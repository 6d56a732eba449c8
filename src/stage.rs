use crate::buffer::RingBuffer;
use crate::metrics::StageMetrics;
use crate::observer::{PipelineEvent, PipelineObserver};
use crate::shutdown::ShutdownSignal;
use crate::Item;
use crossbeam::channel::{self, select, Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;

/// Keeps values that are zero or positive
pub fn is_non_negative(n: Item) -> bool {
    n >= 0
}

/// Keeps nonzero multiples of three
pub fn is_nonzero_multiple_of_three(n: Item) -> bool {
    n != 0 && n % 3 == 0
}

/// Identity, metrics and event sink handed to a stage while it runs
#[derive(Clone)]
pub struct StageContext {
    name: Arc<str>,
    observer: Arc<dyn PipelineObserver>,
    metrics: StageMetrics,
}

impl StageContext {
    /// Create a context reporting under `name`
    pub fn new(
        name: impl Into<Arc<str>>,
        observer: Arc<dyn PipelineObserver>,
        metrics: StageMetrics,
    ) -> Self {
        Self {
            name: name.into(),
            observer,
            metrics,
        }
    }

    /// Get the stage name events are reported under
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared handle to the stage name, for building events
    pub fn stage(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    /// Get the stage's metrics
    pub fn metrics(&self) -> &StageMetrics {
        &self.metrics
    }

    /// Report an event to the observer
    pub fn emit(&self, event: PipelineEvent) {
        self.observer.on_event(&event);
    }
}

/// Trait for a processing stage in the pipeline
pub trait Stage: Send + 'static {
    /// Handle one input item, returning the items to send downstream
    fn process(&mut self, item: Item, ctx: &StageContext) -> Vec<Item>;

    /// Period of the stage's timer, if it has one
    fn tick_interval(&self) -> Option<Duration> {
        None
    }

    /// Called on every timer tick
    fn on_tick(&mut self, _ctx: &StageContext) -> Vec<Item> {
        Vec::new()
    }

    /// Called once when the shutdown signal is observed.
    ///
    /// Returned items are forwarded before the output queue is closed.
    fn on_shutdown(&mut self, _ctx: &StageContext) -> Vec<Item> {
        Vec::new()
    }

    /// Get a human-readable name for this stage.
    ///
    /// Events and logs for the stage are reported under this name.
    fn name(&self) -> &str {
        "stage"
    }
}

/// Drives a stage: waits on its input queue, its timer and the shutdown
/// signal, and sends whatever the stage produces to the output queue.
pub struct StageRunner {
    input: Receiver<Item>,
    output: Sender<Item>,
    shutdown: ShutdownSignal,
    observer: Arc<dyn PipelineObserver>,
    metrics: StageMetrics,
}

impl StageRunner {
    /// Create a runner between two queues, reporting to `observer`
    pub fn new(
        input: Receiver<Item>,
        output: Sender<Item>,
        shutdown: ShutdownSignal,
        observer: Arc<dyn PipelineObserver>,
        metrics: StageMetrics,
    ) -> Self {
        Self {
            input,
            output,
            shutdown,
            observer,
            metrics,
        }
    }

    /// Get a reference to the metrics
    pub fn metrics(&self) -> &StageMetrics {
        &self.metrics
    }

    /// Run the stage until shutdown is signaled or its output goes away.
    ///
    /// The output queue is closed when this returns.
    pub fn run(self, mut stage: Box<dyn Stage>) {
        let Self {
            input,
            output,
            shutdown,
            observer,
            metrics,
        } = self;

        let ctx = StageContext::new(stage.name(), observer, metrics);

        let ticker = match stage.tick_interval() {
            Some(period) => channel::tick(period),
            None => channel::never(),
        };
        let shutdown = shutdown.listener();
        let closed = channel::never::<Item>();
        let mut input_open = true;

        ctx.emit(PipelineEvent::StageStarted { stage: ctx.stage() });

        loop {
            // A closed input stops being a wake-up source; the stage still
            // runs until shutdown.
            let source = if input_open { &input } else { &closed };

            select! {
                recv(source) -> msg => match msg {
                    Ok(value) => {
                        ctx.metrics().record_received();
                        ctx.emit(PipelineEvent::ItemReceived { stage: ctx.stage(), value });
                        let produced = stage.process(value, &ctx);
                        if !forward(&output, produced, &ctx) {
                            break;
                        }
                    }
                    Err(_) => {
                        input_open = false;
                        ctx.emit(PipelineEvent::InputClosed { stage: ctx.stage() });
                    }
                },
                recv(ticker) -> _ => {
                    ctx.emit(PipelineEvent::TimerFired { stage: ctx.stage() });
                    let produced = stage.on_tick(&ctx);
                    if !forward(&output, produced, &ctx) {
                        break;
                    }
                },
                recv(shutdown) -> _ => {
                    ctx.emit(PipelineEvent::ShutdownObserved { stage: ctx.stage() });
                    let produced = stage.on_shutdown(&ctx);
                    forward(&output, produced, &ctx);
                    break;
                },
            }
        }

        drop(output);
        ctx.emit(PipelineEvent::StageStopped { stage: ctx.stage() });
    }
}

/// Send items downstream in order. Returns `false` once the receiver is gone.
fn forward(output: &Sender<Item>, items: Vec<Item>, ctx: &StageContext) -> bool {
    for value in items {
        if output.send(value).is_err() {
            ctx.emit(PipelineEvent::OutputClosed { stage: ctx.stage() });
            return false;
        }
        ctx.metrics().record_forwarded();
        ctx.emit(PipelineEvent::ItemForwarded {
            stage: ctx.stage(),
            value,
        });
    }
    true
}

/// A filtering stage that passes through items matching a predicate
#[derive(Debug)]
pub struct FilterStage<F>
where
    F: Fn(Item) -> bool + Send + 'static,
{
    name: String,
    predicate: F,
}

impl<F> FilterStage<F>
where
    F: Fn(Item) -> bool + Send + 'static,
{
    /// Create a new filter stage
    pub fn new(name: impl Into<String>, predicate: F) -> Self {
        Self {
            name: name.into(),
            predicate,
        }
    }
}

impl<F> Stage for FilterStage<F>
where
    F: Fn(Item) -> bool + Send + 'static,
{
    fn process(&mut self, item: Item, ctx: &StageContext) -> Vec<Item> {
        if (self.predicate)(item) {
            vec![item]
        } else {
            ctx.metrics().record_rejected();
            ctx.emit(PipelineEvent::ItemRejected {
                stage: ctx.stage(),
                value: item,
            });
            Vec::new()
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A batching stage: collects items in a ring buffer and releases them on a
/// fixed timer, and once more on shutdown.
#[derive(Debug)]
pub struct BufferStage {
    name: String,
    buffer: RingBuffer<Item>,
    flush_interval: Duration,
}

impl BufferStage {
    /// Create a batching stage with a ring buffer of `capacity` items
    pub fn new(name: impl Into<String>, capacity: usize, flush_interval: Duration) -> Self {
        Self {
            name: name.into(),
            buffer: RingBuffer::new(capacity),
            flush_interval,
        }
    }

    /// Get the stage's ring buffer
    pub fn buffer(&self) -> &RingBuffer<Item> {
        &self.buffer
    }

    fn drain(&self, ctx: &StageContext) -> Vec<Item> {
        let drained = self.buffer.flush();
        if drained.is_empty() {
            ctx.emit(PipelineEvent::EmptyFlush { stage: ctx.stage() });
        } else {
            ctx.metrics().record_flush();
            ctx.emit(PipelineEvent::BufferFlushed {
                stage: ctx.stage(),
                count: drained.len(),
            });
        }
        drained
    }
}

impl Stage for BufferStage {
    fn process(&mut self, item: Item, ctx: &StageContext) -> Vec<Item> {
        let evicted = self.buffer.push(item);
        ctx.emit(PipelineEvent::ItemBuffered {
            stage: ctx.stage(),
            value: item,
        });
        if let Some(value) = evicted {
            ctx.metrics().record_evicted();
            ctx.emit(PipelineEvent::ItemEvicted {
                stage: ctx.stage(),
                value,
            });
        }
        Vec::new()
    }

    fn tick_interval(&self) -> Option<Duration> {
        Some(self.flush_interval)
    }

    fn on_tick(&mut self, ctx: &StageContext) -> Vec<Item> {
        self.drain(ctx)
    }

    fn on_shutdown(&mut self, ctx: &StageContext) -> Vec<Item> {
        self.drain(ctx)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
