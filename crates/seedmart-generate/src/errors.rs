use thiserror::Error;

use seedmart_sink::SinkError;

/// Errors emitted by the generation engine.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("row {row_index} still violates invariants after {attempts} attempts: {reason}")]
    RetriesExhausted {
        row_index: u64,
        attempts: u32,
        reason: String,
    },
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),
    #[error("run aborted")]
    Aborted,
    #[error("worker panicked during fact generation")]
    WorkerPanic,
}

impl From<seedmart_core::Error> for GenerationError {
    fn from(err: seedmart_core::Error) -> Self {
        GenerationError::InvalidConfig(err.to_string())
    }
}
