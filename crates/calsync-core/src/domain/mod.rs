//! Domain entities and business logic
//!
//! This module contains the core domain types for calsync:
//! - Newtypes for type-safe identifiers and validated domain types
//! - Calendar event projection and color mapping
//! - Workspace credentials and sync cursors
//! - Domain-specific error types

pub mod errors;
pub mod event;
pub mod newtypes;
pub mod workspace;

// Re-export commonly used types
pub use errors::DomainError;
pub use event::{CalendarEvent, EventColor, EventKey};
pub use newtypes::*;
pub use workspace::{SyncCursor, WorkspaceCredential};
