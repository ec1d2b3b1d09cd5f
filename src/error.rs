//! Error types for the database session.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for session and driver operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Error raised by the underlying driver.
    #[error("Driver error: {0}")]
    Driver(#[from] sqlx::Error),

    /// The driver handle could not be acquired.
    #[error("Driver unavailable: {message}")]
    DriverUnavailable { message: String },

    /// Invalid host URI.
    #[error("Invalid connect string: {message}")]
    InvalidConnectString { message: String },

    /// Connection timed out.
    #[error("Connection to {host} timed out after {timeout:?}")]
    ConnectionTimeout { host: String, timeout: Duration },

    /// The requested schema does not exist on the connection.
    #[error("Unknown schema: {schema}")]
    UnknownSchema { schema: String },

    /// Parameter index outside the placeholders of the statement.
    #[error("Parameter index {index} out of bounds (placeholders: {count})")]
    ParameterIndexOutOfBounds { index: usize, count: usize },

    /// A placeholder was left without a value at execute time.
    #[error("No value bound for parameter {position}")]
    UnboundParameter { position: usize },

    /// A parameter value outside the bindable types.
    #[error("Unsupported parameter type at position {position}: {type_name}")]
    UnsupportedParameter { position: usize, type_name: String },

    /// Column index out of bounds.
    #[error("Column index {index} out of bounds (columns: {count})")]
    ColumnIndexOutOfBounds { index: usize, count: usize },

    /// Column access without a current row.
    #[error("No current row")]
    NoCurrentRow,
}

impl Error {
    /// Create an invalid connect string error.
    pub fn invalid_connect_string(message: impl Into<String>) -> Self {
        Self::InvalidConnectString {
            message: message.into(),
        }
    }
}
