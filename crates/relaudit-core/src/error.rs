use thiserror::Error;

/// Core error type shared across relaudit crates.
#[derive(Debug, Error)]
pub enum Error {
    /// Database error or adapter failure.
    #[error("database error: {0}")]
    Db(String),
    /// A catalog snapshot violates internal invariants.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
    /// An identifier was not found in the discovered catalog.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
    /// A requested feature is not yet supported.
    #[error("unsupported: {0}")]
    Unsupported(String),
    /// Catch-all error for unexpected failures.
    #[error("other error: {0}")]
    Other(String),
}

/// Convenience alias for results returned by relaudit crates.
pub type Result<T> = std::result::Result<T, Error>;
