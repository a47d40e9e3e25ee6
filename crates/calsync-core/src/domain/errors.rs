//! Domain error types
//!
//! Validation failures raised when constructing domain newtypes and
//! entities. Adapter-level failures (HTTP, SQL) live with their adapters.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid workspace identifier
    #[error("Invalid workspace ID: {0}")]
    InvalidWorkspaceId(String),

    /// Invalid calendar identifier
    #[error("Invalid calendar ID: {0}")]
    InvalidCalendarId(String),

    /// Invalid external (Google) event identifier
    #[error("Invalid event ID: {0}")]
    InvalidEventId(String),

    /// Invalid sync token
    #[error("Invalid sync token: {0}")]
    InvalidSyncToken(String),

    /// Invalid timezone name
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// ID parsing error
    #[error("Invalid ID format: {0}")]
    InvalidId(String),
}
