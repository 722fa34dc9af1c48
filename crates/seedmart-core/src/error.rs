use thiserror::Error;

/// Core error type shared across seedmart crates.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be resolved or failed validation.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    /// Database error reported by a storage sink.
    #[error("database error: {0}")]
    Db(String),
    /// Catch-all error for unexpected failures.
    #[error("other error: {0}")]
    Other(String),
}

/// Convenience alias for results returned by seedmart crates.
pub type Result<T> = std::result::Result<T, Error>;
