use thiserror::Error;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that can occur while building or running a pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    /// No stages in pipeline
    #[error("Cannot start pipeline with no stages")]
    NoStages,

    /// The input queue was already handed out
    #[error("Pipeline input has already been taken")]
    InputTaken,

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Thread spawn or join error
    #[error("Thread error: {0}")]
    ThreadError(String),

    /// Console I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Interrupt handler could not be installed
    #[error("Signal handler error: {0}")]
    SignalError(#[from] ctrlc::Error),
}
