/// Error Module
///
/// This module defines the error taxonomy of the data-access layer.
/// Driver failures are carried through untouched so callers see exactly
/// what the backend reported.
use thiserror::Error;

/// Boxed error raised by the underlying SQL driver.
pub type DriverError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error type for every data-access operation.
///
/// The first four variants make up the caller-facing taxonomy:
/// - parameter lists the driver rejects
/// - statement preparation or execution failures
/// - out-of-sequence transaction calls
/// - scalar queries that return no rows
///
/// The remaining variants cover schema input validation, the model
/// registry, configuration and I/O.
#[derive(Error, Debug)]
pub enum DalError {
    /// Parameter count rejected before or during execution
    #[error("Parameter mismatch: statement expects {expected} parameter(s), {actual} given")]
    ParameterMismatch { expected: usize, actual: usize },

    /// Preparation or execution failure reported by the driver, shown verbatim
    #[error(transparent)]
    Driver(DriverError),

    /// begin/commit/rollback invoked out of the Idle/Active sequence
    #[error("Transaction error: cannot {operation} while {state}")]
    TransactionState {
        operation: &'static str,
        state: crate::core::db::TransactionState,
    },

    /// A scalar query produced no rows
    #[error("Empty result: query returned no rows")]
    EmptyResult,

    /// Field descriptors that cannot produce DDL
    #[error("Schema error: {0}")]
    Schema(String),

    /// Model identifier with no registered factory
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DalError {
    /// Wraps an arbitrary driver error.
    pub fn driver<E>(err: E) -> Self
    where
        E: Into<DriverError>,
    {
        DalError::Driver(err.into())
    }
}

impl From<rusqlite::Error> for DalError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::InvalidParameterCount(actual, expected) => {
                DalError::ParameterMismatch { expected, actual }
            }
            other => DalError::Driver(Box::new(other)),
        }
    }
}

/// Type alias for Result to use DalError as the error type.
pub type Result<T> = std::result::Result<T, DalError>;
