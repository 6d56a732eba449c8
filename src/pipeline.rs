use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::metrics::StageMetrics;
use crate::observer::{PipelineObserver, TracingObserver};
use crate::shutdown::ShutdownSignal;
use crate::stage::{
    is_non_negative, is_nonzero_multiple_of_three, BufferStage, FilterStage, Stage, StageRunner,
};
use crate::Item;
use crossbeam::channel::{self, Receiver, Sender};
use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// A shareable item predicate
pub type Predicate = Arc<dyn Fn(Item) -> bool + Send + Sync>;

/// How a batching stage holds and releases items
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPolicy {
    /// Ring buffer capacity; the oldest item is overwritten beyond this
    pub capacity: usize,
    /// Period of the flush timer
    pub flush_interval: Duration,
}

/// What a stage does with its items
#[derive(Clone)]
pub enum StageKind {
    Filter(Predicate),
    Batch(BatchPolicy),
}

/// A named stage in the pipeline topology
#[derive(Clone)]
pub struct StageDescriptor {
    name: String,
    kind: StageKind,
}

impl StageDescriptor {
    /// Describe a stage forwarding only the items `predicate` accepts
    pub fn filter<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(Item) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            kind: StageKind::Filter(Arc::new(predicate)),
        }
    }

    /// Describe a stage batching items under `policy`
    pub fn batch(name: impl Into<String>, policy: BatchPolicy) -> Self {
        Self {
            name: name.into(),
            kind: StageKind::Batch(policy),
        }
    }

    /// Get the stage name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get what the stage does
    pub fn kind(&self) -> &StageKind {
        &self.kind
    }

    /// Reject batching policies the stage cannot run with
    fn validate(&self) -> Result<()> {
        if let StageKind::Batch(policy) = &self.kind {
            if policy.capacity == 0 {
                return Err(PipelineError::ConfigError(format!(
                    "stage {}: buffer capacity must be at least 1",
                    self.name
                )));
            }
            if policy.flush_interval.is_zero() {
                return Err(PipelineError::ConfigError(format!(
                    "stage {}: flush interval must be greater than zero",
                    self.name
                )));
            }
        }
        Ok(())
    }

    /// Build the runnable stage this descriptor names
    pub fn instantiate(&self) -> Box<dyn Stage> {
        match &self.kind {
            StageKind::Filter(predicate) => {
                let predicate = Arc::clone(predicate);
                Box::new(FilterStage::new(self.name.clone(), move |n| predicate(n)))
            }
            StageKind::Batch(policy) => Box::new(BufferStage::new(
                self.name.clone(),
                policy.capacity,
                policy.flush_interval,
            )),
        }
    }
}

impl fmt::Debug for StageDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            StageKind::Filter(_) => "Filter".to_string(),
            StageKind::Batch(policy) => format!("{:?}", policy),
        };
        f.debug_struct("StageDescriptor")
            .field("name", &self.name)
            .field("kind", &kind)
            .finish()
    }
}

/// Builder for constructing pipelines
pub struct PipelineBuilder {
    stages: Vec<StageDescriptor>,
    link_capacity: usize,
    observer: Arc<dyn PipelineObserver>,
    shutdown: Option<ShutdownSignal>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder with no stages
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            link_capacity: PipelineConfig::default().link_capacity,
            observer: Arc::new(TracingObserver),
            shutdown: None,
        }
    }

    /// The default topology: drop negatives, keep nonzero multiples of
    /// three, then batch.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new()
            .with_link_capacity(config.link_capacity)
            .filter("filter_negative", is_non_negative)
            .filter("filter_not_divisible_by_3", is_nonzero_multiple_of_three)
            .batch(
                "buffer_and_send",
                BatchPolicy {
                    capacity: config.buffer_capacity,
                    flush_interval: config.flush_interval,
                },
            )
    }

    /// Add a stage to the pipeline
    pub fn add_stage(mut self, stage: StageDescriptor) -> Self {
        self.stages.push(stage);
        self
    }

    /// Add a filter stage
    pub fn filter<F>(self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(Item) -> bool + Send + Sync + 'static,
    {
        self.add_stage(StageDescriptor::filter(name, predicate))
    }

    /// Add a batching stage
    pub fn batch(self, name: impl Into<String>, policy: BatchPolicy) -> Self {
        self.add_stage(StageDescriptor::batch(name, policy))
    }

    /// Set the capacity of every queue between stages (0 = rendezvous)
    pub fn with_link_capacity(mut self, capacity: usize) -> Self {
        self.link_capacity = capacity;
        self
    }

    /// Route events to `observer` instead of `tracing`
    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Share an existing shutdown signal with the pipeline
    pub fn with_shutdown_signal(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Build the pipeline
    pub fn build(self) -> Result<Pipeline> {
        if self.stages.is_empty() {
            return Err(PipelineError::NoStages);
        }
        for stage in &self.stages {
            stage.validate()?;
        }

        let metrics = self.stages.iter().map(|_| StageMetrics::new()).collect();

        Ok(Pipeline {
            stages: self.stages,
            link_capacity: self.link_capacity,
            observer: self.observer,
            shutdown: self.shutdown.unwrap_or_default(),
            metrics,
        })
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

/// A validated, not yet running chain of stages
pub struct Pipeline {
    stages: Vec<StageDescriptor>,
    link_capacity: usize,
    observer: Arc<dyn PipelineObserver>,
    shutdown: ShutdownSignal,
    metrics: Vec<StageMetrics>,
}

impl Pipeline {
    /// Get the stage descriptors in wiring order
    pub fn stages(&self) -> &[StageDescriptor] {
        &self.stages
    }

    /// Get metrics for a specific stage
    pub fn stage_metrics(&self, index: usize) -> Option<&StageMetrics> {
        self.metrics.get(index)
    }

    /// Get a handle to the pipeline's shutdown signal
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Spawn one worker thread per stage, each stage reading the previous
    /// stage's output queue.
    pub fn start(self) -> Result<RunningPipeline> {
        let (input, mut upstream) = link(self.link_capacity);
        let mut handles = Vec::with_capacity(self.stages.len());

        for (descriptor, metrics) in self.stages.iter().zip(&self.metrics) {
            let (tx, rx) = link(self.link_capacity);
            let runner = StageRunner::new(
                upstream,
                tx,
                self.shutdown.clone(),
                Arc::clone(&self.observer),
                metrics.clone(),
            );
            let stage = descriptor.instantiate();

            let spawned = thread::Builder::new()
                .name(format!("stage-{}", descriptor.name()))
                .spawn(move || runner.run(stage));
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    self.shutdown.trigger();
                    return Err(PipelineError::ThreadError(e.to_string()));
                }
            }
            upstream = rx;
        }

        Ok(RunningPipeline {
            input: Some(input),
            output: upstream,
            handles,
            stage_names: self.stages.iter().map(|s| s.name.clone()).collect(),
            metrics: self.metrics,
            shutdown: self.shutdown,
        })
    }
}

fn link(capacity: usize) -> (Sender<Item>, Receiver<Item>) {
    channel::bounded(capacity)
}

/// A running pipeline that can be fed, drained and stopped
pub struct RunningPipeline {
    input: Option<Sender<Item>>,
    output: Receiver<Item>,
    handles: Vec<JoinHandle<()>>,
    stage_names: Vec<String>,
    metrics: Vec<StageMetrics>,
    shutdown: ShutdownSignal,
}

impl RunningPipeline {
    /// Take the sending half of the input queue.
    ///
    /// Dropping it closes the pipeline's input. Fails with
    /// [`PipelineError::InputTaken`] after the first call.
    pub fn take_input(&mut self) -> Result<Sender<Item>> {
        self.input.take().ok_or(PipelineError::InputTaken)
    }

    /// Get the receiving half of the final output queue
    pub fn output(&self) -> &Receiver<Item> {
        &self.output
    }

    /// Get a handle to the pipeline's shutdown signal
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Number of stages in the chain
    pub fn stage_count(&self) -> usize {
        self.stage_names.len()
    }

    /// Get metrics for a stage
    pub fn stage_metrics(&self, index: usize) -> Option<&StageMetrics> {
        self.metrics.get(index)
    }

    /// Check if any stage worker is still running
    pub fn is_running(&self) -> bool {
        self.handles.iter().any(|h| !h.is_finished())
    }

    /// Broadcast shutdown, collect whatever the stages still emit, and join
    /// every worker.
    ///
    /// The output queue is drained until the last stage closes it, so a
    /// stage blocked forwarding its final batch can always finish.
    pub fn stop(&mut self) -> Result<Vec<Item>> {
        self.shutdown.trigger();
        self.input.take();

        let remaining: Vec<Item> = self.output.iter().collect();

        for (handle, name) in self.handles.drain(..).zip(&self.stage_names) {
            handle
                .join()
                .map_err(|_| PipelineError::ThreadError(format!("stage {name} panicked")))?;
        }
        Ok(remaining)
    }

    /// Get a summary of all metrics
    pub fn metrics_summary(&self) -> String {
        let mut summary = String::from("Pipeline Metrics Summary:\n");
        for (name, metrics) in self.stage_names.iter().zip(&self.metrics) {
            summary.push_str(&format!("  {}: {}\n", name, metrics.snapshot().format()));
        }
        summary
    }
}

impl Drop for RunningPipeline {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}
