//! calsync store - Sync-state persistence
//!
//! SQLite-based storage for:
//! - Workspace credentials
//! - Sync cursors (incremental-sync tokens)
//! - The durable calendar-event projection
//!
//! ## Architecture
//!
//! This crate implements the `IEventStore` port from `calsync-core`
//! using SQLite as the storage backend. It is a driven (secondary)
//! adapter in the hexagonal architecture.
//!
//! ## Usage
//!
//! ```no_run
//! use calsync_core::config::DatabaseConfig;
//! use calsync_store::SqliteEventStore;
//!
//! # async fn example() -> Result<(), calsync_core::ports::StoreError> {
//! let store = SqliteEventStore::open(&DatabaseConfig::default()).await?;
//! // Use store as IEventStore...
//! # Ok(())
//! # }
//! ```

pub mod repository;

pub use repository::SqliteEventStore;
