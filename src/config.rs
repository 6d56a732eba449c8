use std::time::Duration;

/// Default ring buffer capacity of the batching stage
pub const DEFAULT_BUFFER_CAPACITY: usize = 5;

/// Default period between batching-stage flushes
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);

/// Default capacity of the queues between stages (0 = rendezvous hand-off)
pub const DEFAULT_LINK_CAPACITY: usize = 0;

/// Tunables for the default pipeline topology
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub buffer_capacity: usize,
    pub flush_interval: Duration,
    pub link_capacity: usize,
}

impl PipelineConfig {
    /// Create a config holding the compiled-in defaults
    pub fn new() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            link_capacity: DEFAULT_LINK_CAPACITY,
        }
    }

    /// Set the batching stage's ring buffer capacity
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Set the batching stage's flush period
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Set the capacity of the queues between stages
    pub fn with_link_capacity(mut self, capacity: usize) -> Self {
        self.link_capacity = capacity;
        self
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new()
    }
}
