use thiserror::Error;

/// Errors emitted by storage sinks.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("sink misuse: {0}")]
    Misuse(String),
}
