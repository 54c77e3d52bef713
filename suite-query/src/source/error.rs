//! Data source error types
//!
//! Storage collaborators report failures through [`SourceError`], which records
//! the operation in flight, a coarse [`SourceErrorKind`], and a message. The
//! pagination layer turns these into failed envelopes; they never reach the
//! caller as panics or raw driver errors.
//!
//! # Example
//!
//! ```rust
//! use suite_query::source::{SourceError, SourceErrorKind, SourceOperation};
//!
//! let error = SourceError::timeout(SourceOperation::Fetch, "query exceeded 30s");
//! assert!(matches!(error.kind, SourceErrorKind::Timeout));
//! assert!(error.is_retriable());
//! ```

use std::fmt;

/// Operation being performed when the source error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceOperation {
    /// Translating a predicate or ordering into the store's query language
    Translate,
    /// Counting matching records
    Count,
    /// Fetching records
    Fetch,
    /// Attaching related data for an expansion path
    Expand,
    /// Opening or closing a consistent read view
    Snapshot,
}

impl fmt::Display for SourceOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Translate => write!(f, "translate"),
            Self::Count => write!(f, "count"),
            Self::Fetch => write!(f, "fetch"),
            Self::Expand => write!(f, "expand"),
            Self::Snapshot => write!(f, "snapshot"),
        }
    }
}

/// Category of source error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceErrorKind {
    /// A record the operation depended on does not exist
    NotFound,
    /// The request could not be expressed against the store (bad field name, unknown path)
    ValidationFailed,
    /// Failed to reach the store
    ConnectionFailed,
    /// Operation timed out
    Timeout,
    /// The store rejected or failed the query
    DatabaseError,
    /// A row could not be decoded
    SerializationError,
    /// Other unclassified error
    Other,
}

impl fmt::Display for SourceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::ValidationFailed => write!(f, "validation_failed"),
            Self::ConnectionFailed => write!(f, "connection_failed"),
            Self::Timeout => write!(f, "timeout"),
            Self::DatabaseError => write!(f, "database_error"),
            Self::SerializationError => write!(f, "serialization_error"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Structured source error with operation context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    /// The operation being performed when the error occurred
    pub operation: SourceOperation,
    /// The category of error
    pub kind: SourceErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Additional context (table name, expansion path, field name)
    pub context: Option<String>,
}

/// Result type for data source operations
pub type SourceResult<T> = std::result::Result<T, SourceError>;

impl SourceError {
    /// Create a new source error
    pub fn new(
        operation: SourceOperation,
        kind: SourceErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            context: None,
        }
    }

    /// Create a validation failed error
    ///
    /// # Example
    ///
    /// ```rust
    /// use suite_query::source::{SourceError, SourceErrorKind, SourceOperation};
    ///
    /// let error = SourceError::validation_failed(SourceOperation::Translate, "unknown field")
    ///     .with_context("nmae");
    /// assert_eq!(error.kind, SourceErrorKind::ValidationFailed);
    /// assert_eq!(error.context.as_deref(), Some("nmae"));
    /// ```
    pub fn validation_failed(operation: SourceOperation, message: impl Into<String>) -> Self {
        Self::new(operation, SourceErrorKind::ValidationFailed, message)
    }

    /// Create a connection failed error
    pub fn connection_failed(operation: SourceOperation, message: impl Into<String>) -> Self {
        Self::new(operation, SourceErrorKind::ConnectionFailed, message)
    }

    /// Create a timeout error
    pub fn timeout(operation: SourceOperation, message: impl Into<String>) -> Self {
        Self::new(operation, SourceErrorKind::Timeout, message)
    }

    /// Create a database error
    pub fn database_error(operation: SourceOperation, message: impl Into<String>) -> Self {
        Self::new(operation, SourceErrorKind::DatabaseError, message)
    }

    /// Create a serialization error
    pub fn serialization_error(operation: SourceOperation, message: impl Into<String>) -> Self {
        Self::new(operation, SourceErrorKind::SerializationError, message)
    }

    /// Add context to an existing error
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Set the operation that caused the error
    #[must_use]
    pub fn with_operation(mut self, operation: SourceOperation) -> Self {
        self.operation = operation;
        self
    }

    /// Check if this error is retriable (transient errors that may succeed on retry)
    pub fn is_retriable(&self) -> bool {
        matches!(
            self.kind,
            SourceErrorKind::ConnectionFailed | SourceErrorKind::Timeout
        )
    }

    /// Whether the error describes a bad request rather than a broken store
    pub fn is_validation(&self) -> bool {
        self.kind == SourceErrorKind::ValidationFailed
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Source {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        if let Some(ref ctx) = self.context {
            write!(f, " [context: {}]", ctx)?;
        }
        Ok(())
    }
}

impl std::error::Error for SourceError {}

#[cfg(feature = "database")]
impl From<sqlx::Error> for SourceError {
    fn from(err: sqlx::Error) -> Self {
        use sqlx::Error as E;
        match err {
            E::RowNotFound => Self::new(
                SourceOperation::Fetch,
                SourceErrorKind::NotFound,
                "Row not found",
            ),
            E::PoolTimedOut => Self::timeout(SourceOperation::Fetch, "Connection pool timed out"),
            E::PoolClosed => {
                Self::connection_failed(SourceOperation::Fetch, "Connection pool is closed")
            }
            E::Io(e) => Self::connection_failed(SourceOperation::Fetch, e.to_string()),
            E::Tls(e) => {
                Self::connection_failed(SourceOperation::Fetch, format!("TLS error: {}", e))
            }
            E::ColumnNotFound(col) => Self::database_error(
                SourceOperation::Fetch,
                format!("Column not found: {}", col),
            ),
            E::ColumnDecode { index, source } => Self::serialization_error(
                SourceOperation::Fetch,
                format!("Failed to decode column {}: {}", index, source),
            ),
            E::Decode(e) => Self::serialization_error(SourceOperation::Fetch, e.to_string()),
            E::Database(e) => {
                let mut error = Self::database_error(SourceOperation::Fetch, e.message());
                if let Some(code) = e.code() {
                    error = error.with_context(format!("sqlstate {}", code));
                }
                error
            }
            other => Self::new(
                SourceOperation::Fetch,
                SourceErrorKind::Other,
                other.to_string(),
            ),
        }
    }
}
