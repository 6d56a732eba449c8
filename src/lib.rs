//! A console-driven integer pipeline with filter stages and a time-windowed
//! ring buffer.
//!
//! Each stage runs on its own thread and talks to its neighbours only through
//! crossbeam hand-off queues. Every stage also watches one shared
//! [`ShutdownSignal`]; on shutdown the filter stages stop at once while the
//! batching stage flushes its ring buffer downstream before closing its
//! output.
//!
//! # Features
//!
//! - Overwrite-on-overflow ring buffer guarded by a single lock
//! - Filter and batching stages driven by one generic `select!` loop
//! - Composable topology built from stage descriptors
//! - Injectable event observers, `tracing`-backed by default
//! - Per-stage metrics: received, forwarded, rejected, evicted, flushes
//!
//! # Example
//!
//! ```no_run
//! use batch_pipeline::{PipelineBuilder, PipelineConfig};
//!
//! # fn main() -> batch_pipeline::Result<()> {
//! let mut running = PipelineBuilder::from_config(&PipelineConfig::default())
//!     .build()?
//!     .start()?;
//!
//! let input = running.take_input()?;
//! for n in [-3, 0, 6, 9, 15] {
//!     input.send(n).ok();
//! }
//! drop(input);
//!
//! // Whatever reached the batching stage comes out of the final flush.
//! let remaining = running.stop()?;
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod config;
pub mod console;
pub mod error;
pub mod metrics;
pub mod observer;
pub mod pipeline;
pub mod shutdown;
pub mod stage;

/// A single value flowing through the pipeline
pub type Item = i64;

// Re-exports for convenience
pub use buffer::RingBuffer;
pub use config::{PipelineConfig, DEFAULT_BUFFER_CAPACITY, DEFAULT_FLUSH_INTERVAL};
pub use error::{PipelineError, Result};
pub use metrics::{MetricsSnapshot, StageMetrics};
pub use observer::{
    NoopObserver, PipelineEvent, PipelineObserver, RecordingObserver, TracingObserver,
};
pub use pipeline::{
    BatchPolicy, Pipeline, PipelineBuilder, Predicate, RunningPipeline, StageDescriptor, StageKind,
};
pub use shutdown::{install_interrupt_handler, ShutdownSignal};
pub use stage::{BufferStage, FilterStage, Stage, StageContext, StageRunner};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
