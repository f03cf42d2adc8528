/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for wait operations
pub type WaitResult<T> = Result<T, WaitError>;

/// Errors that prevent a wait from starting or an object from being built
///
/// Resolutions of a started wait (timeout, interruption, teardown) are not
/// errors; they are reported through [`crate::core::sync::WaitOutcome`].
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum WaitError {
    #[error("Wait list is empty")]
    #[diagnostic(
        code(wait::no_objects),
        help("Pass at least one waitable object.")
    )]
    NoObjects,

    #[error("Wait list holds {count} objects, limit is {max}")]
    #[diagnostic(
        code(wait::too_many_objects),
        help("Split the wait or raise max_objects (hard ceiling is 64).")
    )]
    TooManyObjects { count: usize, max: usize },

    #[error("Invalid wait object at index {0}")]
    #[diagnostic(
        code(wait::invalid_index),
        help("The object is closed, duplicated in the list, being dropped, or belongs to another registry.")
    )]
    InvalidIndex(usize),

    #[error("Failed to construct wait primitive: {0}")]
    #[diagnostic(
        code(wait::construction_failed),
        help("System may be low on memory or threads. Nothing was registered.")
    )]
    ConstructionFailed(String),

    #[error("Invalid configuration: {0}")]
    #[diagnostic(
        code(wait::invalid_config),
        help("Review SyncConfig values and MULTIWAIT_* environment variables.")
    )]
    InvalidConfig(String),
}

impl WaitError {
    /// Index of the offending wait-list entry, if the error names one
    pub fn index(&self) -> Option<usize> {
        match self {
            WaitError::InvalidIndex(index) => Some(*index),
            _ => None,
        }
    }
}

impl From<std::collections::TryReserveError> for WaitError {
    fn from(err: std::collections::TryReserveError) -> Self {
        WaitError::ConstructionFailed(err.to_string())
    }
}

impl From<std::io::Error> for WaitError {
    fn from(err: std::io::Error) -> Self {
        WaitError::ConstructionFailed(err.to_string())
    }
}
