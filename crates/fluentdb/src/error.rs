//! Error types for fluentdb

use thiserror::Error;

/// Result type alias for fluentdb operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Boxed error produced by a driver implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error types for query building, execution and result mapping
#[derive(Debug, Error)]
pub enum OrmError {
    /// `insert` resolved an empty column set
    #[error("insert data cannot be empty")]
    EmptyInsert,

    /// `update` was given no columns
    #[error("update data cannot be empty")]
    EmptyUpdate,

    /// `multi_insert` was given a single row instead of a sequence
    #[error("multi insert data is not a sequence")]
    NotASequence,

    /// An aggregate query returned no rows
    #[error("no rows in result set")]
    NoRows,

    /// A value could not be converted into the requested shape
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Two fields of a record map to the same column
    #[error("column `{0}` is mapped more than once")]
    DuplicateColumn(String),

    /// Commit or rollback without a transaction
    #[error("no active transaction")]
    NoActiveTransaction,

    /// No handle registered for a `group::role` address
    #[error("database `{0}` not found")]
    UnregisteredAddress(String),

    /// Registration or configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The connection deadline elapsed before the driver answered
    #[error("deadline exceeded")]
    Timeout,

    /// Error reported by the underlying driver, passed through unchanged
    #[error(transparent)]
    Driver(BoxError),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl OrmError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Wrap a driver error
    pub fn driver(err: impl Into<BoxError>) -> Self {
        Self::Driver(err.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Check if this is the "aggregate over an empty result" signal
    pub fn is_no_rows(&self) -> bool {
        matches!(self, Self::NoRows)
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Check if this is an unregistered database address
    pub fn is_unregistered(&self) -> bool {
        matches!(self, Self::UnregisteredAddress(_))
    }

    /// Attach a column name to a decode error produced without one.
    pub(crate) fn with_column(self, column: &str) -> Self {
        match self {
            Self::Decode { column: c, message } if c.is_empty() => Self::Decode {
                column: column.to_string(),
                message,
            },
            other => other,
        }
    }
}

#[cfg(feature = "mysql")]
impl From<sqlx::Error> for OrmError {
    fn from(err: sqlx::Error) -> Self {
        Self::Driver(Box::new(err))
    }
}
