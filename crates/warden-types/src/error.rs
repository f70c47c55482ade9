//! Model error types.

use thiserror::Error;

/// Errors raised while building an [`Authentication`](crate::Authentication).
///
/// Building is all-or-nothing: on error no partial aggregate is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// The builder input is structurally invalid (e.g. no user supplied).
    #[error("validation failed: {0}")]
    Validation(String),
}

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
