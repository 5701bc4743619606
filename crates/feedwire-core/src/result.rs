//! Convenience result type alias for Feedwire.

use crate::error::AppError;

/// A specialized `Result` type for Feedwire operations.
pub type AppResult<T> = Result<T, AppError>;
