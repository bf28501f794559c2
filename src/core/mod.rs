/// Core Module
///
/// This module contains the data-access layer and its error type.

pub mod db;
pub mod error;

// Re-export commonly used types for convenience
pub use error::{DalError, DriverError, Result};
