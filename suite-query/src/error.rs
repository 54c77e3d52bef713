//! Error types

use thiserror::Error;

use crate::source::SourceError;

/// Result type alias using the crate's error type
pub type Result<T> = std::result::Result<T, Error>;

/// Crate error type
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// The request cannot be satisfied as stated (unknown sort field and the like)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Structured data source error with operation context
    #[error("{0}")]
    Source(SourceError),

    /// The caller cancelled the operation
    #[error(transparent)]
    Cancelled(#[from] Cancelled),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the error is the caller's fault rather than the system's
    pub fn is_validation(&self) -> bool {
        match self {
            Self::Validation(_) => true,
            Self::Source(e) => e.is_validation(),
            _ => false,
        }
    }
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

impl From<SourceError> for Error {
    fn from(err: SourceError) -> Self {
        // Source-level validation problems are still validation problems
        if err.is_validation() {
            Error::Validation(err.message)
        } else {
            Error::Source(err)
        }
    }
}

/// Outcome of an operation aborted through its cancellation token
///
/// Distinct from every failure: a cancelled request produces no envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Operation cancelled")]
pub struct Cancelled;
